//! Market data provider port.

use crate::domain::error::PerfError;
use crate::domain::price::PricePoint;
use async_trait::async_trait;

/// Source of daily closes for one symbol.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily closes with timestamps in `[from_epoch_secs, to_epoch_secs]`,
    /// ascending by date. Failures are reported as [`PerfError::Provider`].
    async fn fetch_range(
        &self,
        symbol: &str,
        from_epoch_secs: i64,
        to_epoch_secs: i64,
    ) -> Result<Vec<PricePoint>, PerfError>;

    /// Tag written into cached records, e.g. `"yahoo-chart"`.
    fn tag(&self) -> &'static str;
}
