//! Comparison orchestration: resolve entries, fetch histories, build and
//! align composites.

use crate::domain::align::{align_all, AlignedChart};
use crate::domain::basket::Basket;
use crate::domain::composite::{build_composite, CompositeSeries};
use crate::domain::config_validation::DEFAULT_MAX_ENTRIES;
use crate::domain::error::PerfError;
use crate::domain::history_cache::HistoryCache;
use crate::domain::price::{InstrumentHistory, PricePoint};
use crate::domain::range::Range;
use crate::domain::summary::{period_returns, PeriodReturns};
use crate::domain::yoy::{yoy_for_series, YoyRow};
use crate::ports::group_store::GroupStore;
use crate::ports::symbol_resolver::SymbolResolver;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A symbol whose history could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub histories: HashMap<String, InstrumentHistory>,
    pub failures: Vec<SymbolFailure>,
}

impl FetchOutcome {
    /// Closes per symbol, the shape the composite builder takes.
    pub fn closes(&self) -> HashMap<String, Vec<PricePoint>> {
        self.histories
            .iter()
            .map(|(symbol, h)| (symbol.clone(), h.points.clone()))
            .collect()
    }

    /// The failures as one provider error, if there were any.
    pub fn failure_error(&self) -> Option<PerfError> {
        match self.failures.as_slice() {
            [] => None,
            [only] => Some(PerfError::provider(&only.symbol, only.reason.clone())),
            many => {
                let symbols: Vec<&str> = many.iter().map(|f| f.symbol.as_str()).collect();
                let reasons: Vec<String> = many
                    .iter()
                    .map(|f| format!("{}: {}", f.symbol, f.reason))
                    .collect();
                Some(PerfError::provider(&symbols.join(", "), reasons.join("; ")))
            }
        }
    }
}

/// One basket's curve plus the symbols that could not be loaded for it.
#[derive(Debug, Clone)]
pub struct BasketComposite {
    pub series: CompositeSeries,
    pub failures: Vec<SymbolFailure>,
}

#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub range: Range,
    pub chart: AlignedChart,
    pub composites: Vec<CompositeSeries>,
    pub returns: Vec<PeriodReturns>,
    /// Entries that matched neither a saved group nor a symbol.
    pub unresolved: Vec<String>,
    pub failures: Vec<SymbolFailure>,
}

pub struct Comparison {
    cache: HistoryCache,
    resolver: Arc<dyn SymbolResolver>,
    groups: Arc<dyn GroupStore>,
    max_entries: usize,
}

impl Comparison {
    pub fn new(
        cache: HistoryCache,
        resolver: Arc<dyn SymbolResolver>,
        groups: Arc<dyn GroupStore>,
    ) -> Self {
        Self {
            cache,
            resolver,
            groups,
            max_entries: DEFAULT_MAX_ENTRIES as usize,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// A saved group name wins over symbol resolution.
    pub fn resolve_entry(&self, text: &str) -> Result<Basket, PerfError> {
        let text = text.trim();
        if let Some(group) = self.groups.find(text)? {
            return Ok(group.to_basket());
        }
        self.resolver
            .resolve(text)
            .map(|symbol| Basket::single(&symbol))
            .ok_or_else(|| PerfError::Resolution {
                text: text.to_string(),
            })
    }

    /// Load every symbol concurrently, one task each. A failing symbol is
    /// recorded and does not affect the others.
    pub async fn fetch_all<S: AsRef<str>>(&self, symbols: &[S]) -> FetchOutcome {
        let mut seen = HashSet::new();
        let distinct: Vec<String> = symbols
            .iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| seen.insert(s.clone()))
            .collect();

        let handles = distinct.iter().map(|symbol| {
            let cache = self.cache.clone();
            let symbol = symbol.clone();
            tokio::spawn(async move { cache.get(&symbol).await })
        });
        let results = join_all(handles).await;

        let mut outcome = FetchOutcome::default();
        for (symbol, result) in distinct.into_iter().zip(results) {
            let reason = match result {
                Ok(Ok(history)) => {
                    outcome.histories.insert(symbol, history);
                    continue;
                }
                Ok(Err(PerfError::Provider { reason, .. })) => reason,
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("fetch task failed: {e}"),
            };
            tracing::warn!(%symbol, %reason, "skipping symbol");
            outcome.failures.push(SymbolFailure { symbol, reason });
        }
        outcome
    }

    /// Composite curve of one basket. Partial failures ride along with the
    /// series; if the curve is empty because of them, they become the error.
    pub async fn get_composite(
        &self,
        basket: &Basket,
        range: Range,
    ) -> Result<BasketComposite, PerfError> {
        let symbols: Vec<&str> = basket.symbols().collect();
        let outcome = self.fetch_all(&symbols).await;
        let series = build_composite(basket, &outcome.closes(), range);
        if series.points.is_empty() {
            if let Some(err) = outcome.failure_error() {
                return Err(err);
            }
        }
        Ok(BasketComposite {
            series,
            failures: outcome.failures,
        })
    }

    /// Year-over-year rows for one entry.
    pub async fn yoy(&self, entry: &str, range: Range) -> Result<(String, Vec<YoyRow>), PerfError> {
        if !range.supports_yoy() {
            return Err(PerfError::UnsupportedRange {
                range: range.to_string(),
            });
        }
        let basket = self.resolve_entry(entry)?;
        let composite = self.get_composite(&basket, range).await?.series;
        let chart = align_all(std::slice::from_ref(&composite));
        let Some(series) = chart.series_by_label(&basket.label) else {
            return Err(PerfError::InsufficientData {
                label: basket.label,
            });
        };
        let rows = yoy_for_series(&chart, series, range)?;
        Ok((basket.label, rows))
    }

    /// Compare free-text entries (group names or symbols) over `range`.
    pub async fn compare<S: AsRef<str>>(
        &self,
        entries: &[S],
        range: Range,
    ) -> Result<ComparisonReport, PerfError> {
        let entries: Vec<&str> = entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .collect();
        if entries.len() > self.max_entries {
            return Err(PerfError::TooManyEntries {
                given: entries.len(),
                max: self.max_entries,
            });
        }

        let mut baskets = Vec::new();
        let mut unresolved = Vec::new();
        for entry in entries {
            match self.resolve_entry(entry) {
                Ok(basket) => baskets.push(basket),
                Err(PerfError::Resolution { text }) => {
                    tracing::warn!(%text, "comparison entry did not resolve");
                    unresolved.push(text);
                }
                Err(e) => return Err(e),
            }
        }

        self.run(baskets, range, unresolved, "comparison").await
    }

    /// Every component of a saved group as its own curve.
    pub async fn compare_components(
        &self,
        group_name: &str,
        range: Range,
    ) -> Result<ComparisonReport, PerfError> {
        let group = self
            .groups
            .find(group_name)?
            .ok_or_else(|| PerfError::InvalidGroup {
                reason: format!("no saved group named \"{}\"", group_name.trim()),
            })?;

        let mut seen = HashSet::new();
        let baskets = group
            .assets
            .iter()
            .filter(|a| seen.insert(a.symbol.clone()))
            .map(|a| Basket::single(&a.symbol))
            .collect();

        self.run(baskets, range, Vec::new(), &group.name).await
    }

    async fn run(
        &self,
        baskets: Vec<Basket>,
        range: Range,
        unresolved: Vec<String>,
        label: &str,
    ) -> Result<ComparisonReport, PerfError> {
        if baskets.is_empty() {
            return Err(PerfError::InsufficientData {
                label: label.to_string(),
            });
        }

        let symbols: Vec<&str> = baskets.iter().flat_map(|b| b.symbols()).collect();
        let outcome = self.fetch_all(&symbols).await;
        let closes = outcome.closes();

        let composites: Vec<CompositeSeries> = baskets
            .iter()
            .map(|b| build_composite(b, &closes, range))
            .collect();
        let chart = align_all(&composites);
        if chart.is_empty() {
            if let Some(err) = outcome.failure_error() {
                return Err(err);
            }
            return Err(PerfError::InsufficientData {
                label: label.to_string(),
            });
        }

        let returns = baskets
            .iter()
            .map(|b| period_returns(b, &closes))
            .collect();

        tracing::info!(
            baskets = baskets.len(),
            dates = chart.labels.len(),
            failures = outcome.failures.len(),
            %range,
            "comparison built"
        );

        Ok(ComparisonReport {
            range,
            chart,
            composites,
            returns,
            unresolved,
            failures: outcome.failures,
        })
    }
}
