//! Domain error types.

/// Top-level error type for basketperf.
#[derive(Debug, thiserror::Error)]
pub enum PerfError {
    #[error("could not resolve a symbol for \"{text}\"")]
    Resolution { text: String },

    #[error("provider error for {symbol}: {reason}")]
    Provider { symbol: String, reason: String },

    #[error("no data available to plot for {label}")]
    InsufficientData { label: String },

    #[error("year-over-year returns are not available for range {range}")]
    UnsupportedRange { range: String },

    #[error("unknown range \"{token}\" (expected ytd, 1y, 3y, 5y or 10y)")]
    UnknownRange { token: String },

    #[error("history store error: {reason}")]
    Store { reason: String },

    #[error("invalid group: {reason}")]
    InvalidGroup { reason: String },

    #[error("too many comparison entries: {given} given, at most {max} allowed")]
    TooManyEntries { given: usize, max: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PerfError {
    pub fn provider(symbol: &str, reason: impl Into<String>) -> Self {
        PerfError::Provider {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn store(reason: impl std::fmt::Display) -> Self {
        PerfError::Store {
            reason: reason.to_string(),
        }
    }
}

impl From<&PerfError> for std::process::ExitCode {
    fn from(err: &PerfError) -> Self {
        let code: u8 = match err {
            PerfError::Io(_) | PerfError::Json(_) | PerfError::Store { .. } => 1,
            PerfError::ConfigParse { .. }
            | PerfError::ConfigMissing { .. }
            | PerfError::ConfigInvalid { .. } => 2,
            PerfError::Provider { .. } => 3,
            PerfError::Resolution { .. }
            | PerfError::UnknownRange { .. }
            | PerfError::UnsupportedRange { .. }
            | PerfError::InvalidGroup { .. }
            | PerfError::TooManyEntries { .. } => 4,
            PerfError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
