//! Daily price points and per-symbol price histories.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One daily close. Dates are UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// The cached record for one symbol. This is the exact shape written to
/// the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentHistory {
    pub symbol: String,
    pub provider: String,
    pub last_updated: DateTime<Utc>,
    pub points: Vec<PricePoint>,
}

impl InstrumentHistory {
    pub fn new(
        symbol: impl Into<String>,
        provider: impl Into<String>,
        last_updated: DateTime<Utc>,
        points: Vec<PricePoint>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            provider: provider.into(),
            last_updated,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Merge `incoming` into `existing` keyed by date.
///
/// Incoming points replace existing points on the same date; everything else
/// from `existing` is kept. The result is ascending by date with one point
/// per date, so merging the same window twice is a no-op.
pub fn merge_by_date(existing: &[PricePoint], incoming: &[PricePoint]) -> Vec<PricePoint> {
    let mut by_date: BTreeMap<NaiveDate, PricePoint> =
        existing.iter().map(|p| (p.date, *p)).collect();
    for p in incoming {
        by_date.insert(p.date, *p);
    }
    by_date.into_values().collect()
}

/// Sort ascending by date and keep the last point seen for each date.
pub fn normalize_points(points: Vec<PricePoint>) -> Vec<PricePoint> {
    merge_by_date(&[], &points)
}
