//! SQLite history store.
//!
//! Same record shape as the JSON file store, one row per symbol key with the
//! points kept as a JSON array.

use crate::domain::error::PerfError;
use crate::domain::history_cache::sanitize_key;
use crate::domain::price::{InstrumentHistory, PricePoint};
use crate::ports::config_port::ConfigPort;
use crate::ports::history_store::HistoryStore;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

pub struct SqliteHistoryStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteHistoryStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PerfError> {
        let db_path =
            config
                .get_string("cache", "sqlite_path")
                .ok_or_else(|| PerfError::ConfigMissing {
                    section: "cache".into(),
                    key: "sqlite_path".into(),
                })?;

        let pool_size = config.get_int("cache", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| PerfError::store(e))?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, PerfError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| PerfError::store(e))?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PerfError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| PerfError::store(e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (
                key TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                provider TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                points_json TEXT NOT NULL
            );",
        )
        .map_err(|e: rusqlite::Error| PerfError::store(e))?;

        Ok(())
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn get(&self, symbol: &str) -> Result<Option<InstrumentHistory>, PerfError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| PerfError::store(e))?;

        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT symbol, provider, last_updated, points_json FROM history WHERE key = ?1",
                params![sanitize_key(symbol)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(|e: rusqlite::Error| PerfError::store(e))?;

        let Some((symbol, provider, last_updated, points_json)) = row else {
            return Ok(None);
        };

        // A row that no longer decodes is a miss; the next full fetch replaces it.
        let last_updated = match DateTime::parse_from_rfc3339(&last_updated) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "corrupt last_updated in cache row");
                return Ok(None);
            }
        };
        let points: Vec<PricePoint> = match serde_json::from_str(&points_json) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "corrupt points in cache row");
                return Ok(None);
            }
        };

        Ok(Some(InstrumentHistory {
            symbol,
            provider,
            last_updated,
            points,
        }))
    }

    fn put(&self, history: &InstrumentHistory) -> Result<(), PerfError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| PerfError::store(e))?;
        let points_json = serde_json::to_string(&history.points)?;

        conn.execute(
            "INSERT OR REPLACE INTO history (key, symbol, provider, last_updated, points_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sanitize_key(&history.symbol),
                history.symbol,
                history.provider,
                history.last_updated.to_rfc3339(),
                points_json
            ],
        )
        .map_err(|e: rusqlite::Error| PerfError::store(e))?;

        Ok(())
    }
}
