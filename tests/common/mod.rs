#![allow(dead_code)]

use async_trait::async_trait;
use basketperf::domain::basket::{Group, WeightedAsset};
use basketperf::domain::error::PerfError;
use basketperf::domain::price::{InstrumentHistory, PricePoint};
use basketperf::ports::group_store::GroupStore;
use basketperf::ports::history_store::HistoryStore;
use basketperf::ports::price_provider::PriceProvider;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Provider serving fixed closes, recording every requested window.
pub struct MockProvider {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
    pub calls: Mutex<Vec<(String, i64, i64)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_points(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(symbol.to_string(), points);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, i64, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceProvider for MockProvider {
    /// Serves only the points whose date falls inside the window.
    async fn fetch_range(
        &self,
        symbol: &str,
        from_epoch_secs: i64,
        to_epoch_secs: i64,
    ) -> Result<Vec<PricePoint>, PerfError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), from_epoch_secs, to_epoch_secs));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(PerfError::provider(symbol, reason.clone()));
        }
        let points = self.data.get(symbol).cloned().unwrap_or_default();
        Ok(points
            .into_iter()
            .filter(|p| {
                let ts = midnight(p.date);
                ts >= from_epoch_secs && ts <= to_epoch_secs
            })
            .collect())
    }

    fn tag(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<HashMap<String, InstrumentHistory>>,
}

impl MemoryStore {
    pub fn with_history(self, history: InstrumentHistory) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(history.symbol.clone(), history);
        self
    }

    pub fn get_record(&self, symbol: &str) -> Option<InstrumentHistory> {
        self.records.lock().unwrap().get(symbol).cloned()
    }
}

impl HistoryStore for MemoryStore {
    fn get(&self, symbol: &str) -> Result<Option<InstrumentHistory>, PerfError> {
        Ok(self.records.lock().unwrap().get(symbol).cloned())
    }

    fn put(&self, history: &InstrumentHistory) -> Result<(), PerfError> {
        self.records
            .lock()
            .unwrap()
            .insert(history.symbol.clone(), history.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryGroups {
    pub groups: Mutex<Vec<Group>>,
}

impl MemoryGroups {
    pub fn with_group(self, name: &str, assets: &[(&str, f64)]) -> Self {
        self.groups.lock().unwrap().push(Group {
            name: name.to_string(),
            assets: assets
                .iter()
                .map(|(s, w)| WeightedAsset::new(*s, *w))
                .collect(),
        });
        self
    }
}

impl GroupStore for MemoryGroups {
    fn list(&self) -> Result<Vec<Group>, PerfError> {
        Ok(self.groups.lock().unwrap().clone())
    }

    fn save(&self, group: Group) -> Result<(), PerfError> {
        let mut groups = self.groups.lock().unwrap();
        groups.retain(|g| !g.name.eq_ignore_ascii_case(&group.name));
        groups.push(group);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool, PerfError> {
        let mut groups = self.groups.lock().unwrap();
        let before = groups.len();
        groups.retain(|g| !g.name.eq_ignore_ascii_case(name));
        Ok(groups.len() != before)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn midnight(d: NaiveDate) -> i64 {
    d.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp()
}

pub fn point(d: &str, close: f64) -> PricePoint {
    PricePoint::new(date(d), close)
}

/// Closes on consecutive calendar days from `start`.
pub fn daily(start: &str, closes: &[f64]) -> Vec<PricePoint> {
    let start = date(start);
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| PricePoint::new(start + chrono::Duration::days(i as i64), *c))
        .collect()
}

pub fn closes_map(entries: &[(&str, Vec<PricePoint>)]) -> HashMap<String, Vec<PricePoint>> {
    entries
        .iter()
        .map(|(s, p)| (s.to_string(), p.clone()))
        .collect()
}
