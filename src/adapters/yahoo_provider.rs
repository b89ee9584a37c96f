//! Yahoo Finance chart API provider.

use crate::domain::error::PerfError;
use crate::domain::price::PricePoint;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_provider::PriceProvider;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_USER_AGENT: &str = "basketperf/0.1";
pub const PROVIDER_TAG: &str = "yahoo-chart";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChartError {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChartResult {
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Indicators {
    quote: Vec<CloseColumn>,
    adjclose: Vec<AdjCloseColumn>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CloseColumn {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdjCloseColumn {
    adjclose: Vec<Option<f64>>,
}

/// Turn a chart response body into daily closes.
///
/// The adjusted close is preferred and the raw close used where it is
/// missing; bars with neither are skipped. Timestamps become UTC dates.
pub fn parse_chart_payload(symbol: &str, body: &str) -> Result<Vec<PricePoint>, PerfError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| PerfError::provider(symbol, format!("malformed chart payload: {e}")))?;

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        let reason = envelope
            .chart
            .error
            .and_then(|e| e.description)
            .unwrap_or_else(|| "response carried no data".to_string());
        return Err(PerfError::provider(symbol, reason));
    };

    let close = result.indicators.quote.first().map(|q| q.close.as_slice()).unwrap_or(&[]);
    let adjclose = result
        .indicators
        .adjclose
        .first()
        .map(|a| a.adjclose.as_slice())
        .unwrap_or(&[]);

    let mut points: Vec<PricePoint> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let value = adjclose
                .get(i)
                .copied()
                .flatten()
                .or_else(|| close.get(i).copied().flatten())?;
            if !value.is_finite() || value <= 0.0 {
                return None;
            }
            let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(PricePoint::new(date, value))
        })
        .collect();

    points.sort_by_key(|p| p.date);
    Ok(points)
}

pub struct YahooChartProvider {
    client: Client,
    base_url: Url,
}

impl YahooChartProvider {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, PerfError> {
        let base_url = Url::parse(base_url).map_err(|e| PerfError::ConfigInvalid {
            section: "provider".into(),
            key: "base_url".into(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| PerfError::Io(std::io::Error::other(e)))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PerfError> {
        let base_url = config
            .get_string("provider", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let user_agent = config
            .get_string("provider", "user_agent")
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let timeout_secs = config.get_int("provider", "timeout_secs", 20).max(1) as u64;
        Self::new(&base_url, &user_agent, Duration::from_secs(timeout_secs))
    }

    fn chart_url(&self, symbol: &str) -> Result<Url, PerfError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PerfError::provider(symbol, "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

#[async_trait]
impl PriceProvider for YahooChartProvider {
    async fn fetch_range(
        &self,
        symbol: &str,
        from_epoch_secs: i64,
        to_epoch_secs: i64,
    ) -> Result<Vec<PricePoint>, PerfError> {
        let url = self.chart_url(symbol)?;
        tracing::debug!(symbol, from_epoch_secs, to_epoch_secs, "requesting chart");

        let response = self
            .client
            .get(url)
            .query(&[
                ("period1", from_epoch_secs.to_string()),
                ("period2", to_epoch_secs.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| PerfError::provider(symbol, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PerfError::provider(
                symbol,
                format!("upstream returned {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PerfError::provider(symbol, e.to_string()))?;
        parse_chart_payload(symbol, &body)
    }

    fn tag(&self) -> &'static str {
        PROVIDER_TAG
    }
}
