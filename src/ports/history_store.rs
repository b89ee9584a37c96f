//! Price history persistence port.

use crate::domain::error::PerfError;
use crate::domain::price::InstrumentHistory;

/// Key-value storage of one [`InstrumentHistory`] per symbol.
///
/// `put` replaces the whole record.
pub trait HistoryStore: Send + Sync {
    fn get(&self, symbol: &str) -> Result<Option<InstrumentHistory>, PerfError>;

    fn put(&self, history: &InstrumentHistory) -> Result<(), PerfError>;
}
