//! Incremental price history cache.
//!
//! Sits between callers and the market data provider. A symbol's first
//! request downloads its whole history; later requests only ask the provider
//! for the days after the last cached date and merge them in.

use crate::domain::error::PerfError;
use crate::domain::price::{merge_by_date, normalize_points, InstrumentHistory};
use crate::ports::history_store::HistoryStore;
use crate::ports::price_provider::PriceProvider;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::{Arc, LazyLock};

pub const ONE_DAY_SECS: i64 = 24 * 60 * 60;

static UNSAFE_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9=^.-]").expect("valid regex"));

/// Storage key for `symbol`: every character outside `[A-Za-z0-9=^.-]`
/// becomes `_`.
pub fn sanitize_key(symbol: &str) -> String {
    UNSAFE_KEY_CHARS.replace_all(symbol, "_").into_owned()
}

/// What a cache lookup has to do for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    /// No usable record: download everything.
    Full,
    /// Last cached date is today or later.
    UpToDate,
    /// Download only the dates after `last_cached`.
    Extend { last_cached: NaiveDate },
}

pub fn plan_refresh(cached: Option<&InstrumentHistory>, today: NaiveDate) -> RefreshPlan {
    match cached.and_then(InstrumentHistory::last_date) {
        None => RefreshPlan::Full,
        Some(last) if last >= today => RefreshPlan::UpToDate,
        Some(last) => RefreshPlan::Extend { last_cached: last },
    }
}

/// Epoch-second window for the provider call: `(last_cached, now]` for an
/// extension, everything up to `now` for a full download. The upper bound
/// is padded by a day so today's bar is not cut off.
pub fn fetch_window(plan: RefreshPlan, now: DateTime<Utc>) -> Option<(i64, i64)> {
    let to = now.timestamp() + ONE_DAY_SECS;
    match plan {
        RefreshPlan::Full => Some((0, to)),
        RefreshPlan::UpToDate => None,
        RefreshPlan::Extend { last_cached } => {
            let midnight = last_cached.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
            Some((midnight + ONE_DAY_SECS, to))
        }
    }
}

#[derive(Clone)]
pub struct HistoryCache {
    provider: Arc<dyn PriceProvider>,
    store: Arc<dyn HistoryStore>,
}

impl HistoryCache {
    pub fn new(provider: Arc<dyn PriceProvider>, store: Arc<dyn HistoryStore>) -> Self {
        Self { provider, store }
    }

    pub async fn get(&self, symbol: &str) -> Result<InstrumentHistory, PerfError> {
        self.get_at(symbol, Utc::now()).await
    }

    /// [`HistoryCache::get`] with an explicit clock.
    pub async fn get_at(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<InstrumentHistory, PerfError> {
        let cached = self.load(symbol).await?;
        let plan = plan_refresh(cached.as_ref(), now.date_naive());

        let Some((from, to)) = fetch_window(plan, now) else {
            tracing::debug!(symbol, "history cache hit");
            return cached.ok_or_else(|| PerfError::store("cache record vanished"));
        };

        let incoming = self.provider.fetch_range(symbol, from, to).await?;

        let history = match (plan, cached) {
            (RefreshPlan::Extend { last_cached }, Some(existing)) => {
                tracing::info!(
                    symbol,
                    %last_cached,
                    new_points = incoming.len(),
                    "extending cached history"
                );
                InstrumentHistory {
                    last_updated: now,
                    points: merge_by_date(&existing.points, &incoming),
                    ..existing
                }
            }
            _ => {
                tracing::info!(symbol, points = incoming.len(), "downloaded full history");
                InstrumentHistory::new(
                    symbol,
                    self.provider.tag(),
                    now,
                    normalize_points(incoming),
                )
            }
        };

        self.save(history.clone()).await?;
        Ok(history)
    }

    /// Store reads run on the blocking pool.
    async fn load(&self, symbol: &str) -> Result<Option<InstrumentHistory>, PerfError> {
        let store = Arc::clone(&self.store);
        let symbol = symbol.to_string();
        tokio::task::spawn_blocking(move || store.get(&symbol))
            .await
            .map_err(|e| PerfError::store(format!("cache read task failed: {e}")))?
    }

    async fn save(&self, history: InstrumentHistory) -> Result<(), PerfError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.put(&history))
            .await
            .map_err(|e| PerfError::store(format!("cache write task failed: {e}")))?
    }
}
