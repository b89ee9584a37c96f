//! JSON file history store: one `<key>.json` file per symbol.

use crate::domain::error::PerfError;
use crate::domain::history_cache::sanitize_key;
use crate::domain::price::InstrumentHistory;
use crate::ports::config_port::ConfigPort;
use crate::ports::history_store::HistoryStore;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_DIR: &str = ".cache/market-data";

pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let dir = config
            .get_string("cache", "dir")
            .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string());
        Self::new(PathBuf::from(dir))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", sanitize_key(symbol)))
    }
}

impl HistoryStore for JsonFileStore {
    /// A missing, unreadable or corrupt file is a cache miss.
    fn get(&self, symbol: &str) -> Result<Option<InstrumentHistory>, PerfError> {
        let path = self.record_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache record");
                return Ok(None);
            }
        };

        match serde_json::from_str(&content) {
            Ok(history) => Ok(Some(history)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache record");
                Ok(None)
            }
        }
    }

    fn put(&self, history: &InstrumentHistory) -> Result<(), PerfError> {
        fs::create_dir_all(&self.base_path).map_err(|e| PerfError::Store {
            reason: format!("failed to create {}: {}", self.base_path.display(), e),
        })?;
        let path = self.record_path(&history.symbol);
        let json = serde_json::to_string(history)?;
        fs::write(&path, json).map_err(|e| PerfError::Store {
            reason: format!("failed to write {}: {}", path.display(), e),
        })
    }
}
