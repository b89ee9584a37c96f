//! CSV file price provider for offline runs.
//!
//! Reads `{dir}/{SYMBOL}.csv` with a `date,close` header and returns the
//! rows that fall inside the requested window.

use crate::domain::error::PerfError;
use crate::domain::price::{normalize_points, PricePoint};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_provider::PriceProvider;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use std::fs;
use std::path::PathBuf;

pub const PROVIDER_TAG: &str = "csv";

pub struct CsvProvider {
    base_path: PathBuf,
}

impl CsvProvider {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PerfError> {
        let dir = config
            .get_string("provider", "csv_dir")
            .ok_or_else(|| PerfError::ConfigMissing {
                section: "provider".into(),
                key: "csv_dir".into(),
            })?;
        Ok(Self::new(PathBuf::from(dir)))
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_points(&self, symbol: &str) -> Result<Vec<PricePoint>, PerfError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| {
            PerfError::provider(symbol, format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.records() {
            let record =
                result.map_err(|e| PerfError::provider(symbol, format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| PerfError::provider(symbol, "missing date column"))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| PerfError::provider(symbol, format!("invalid date format: {}", e)))?;

            let close_str = record
                .get(1)
                .ok_or_else(|| PerfError::provider(symbol, "missing close column"))?
                .trim();
            // An empty close is a non-trading row.
            if close_str.is_empty() {
                continue;
            }
            let close: f64 = close_str
                .parse()
                .map_err(|e| PerfError::provider(symbol, format!("invalid close value: {}", e)))?;
            if !close.is_finite() || close <= 0.0 {
                tracing::debug!(symbol, %date, close, "skipping non-positive close");
                continue;
            }

            points.push(PricePoint::new(date, close));
        }

        Ok(normalize_points(points))
    }
}

fn epoch_date(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

#[async_trait]
impl PriceProvider for CsvProvider {
    async fn fetch_range(
        &self,
        symbol: &str,
        from_epoch_secs: i64,
        to_epoch_secs: i64,
    ) -> Result<Vec<PricePoint>, PerfError> {
        let from = epoch_date(from_epoch_secs).unwrap_or(NaiveDate::MIN);
        let to = epoch_date(to_epoch_secs).unwrap_or(NaiveDate::MAX);

        let points = self
            .read_points(symbol)?
            .into_iter()
            .filter(|p| p.date >= from && p.date <= to)
            .collect();
        Ok(points)
    }

    fn tag(&self) -> &'static str {
        PROVIDER_TAG
    }
}
