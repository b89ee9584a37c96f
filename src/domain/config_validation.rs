//! Configuration validation.
//!
//! Checks every section the binary reads before any adapter is built.

use crate::domain::error::PerfError;
use crate::domain::range::Range;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_MAX_ENTRIES: i64 = 4;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), PerfError> {
    validate_cache(config)?;
    validate_provider(config)?;
    validate_compare(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PerfError {
    PerfError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, PerfError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(PerfError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Integer key that must be at least `min` when present.
fn validate_min_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    min: i64,
) -> Result<(), PerfError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= min => Ok(()),
        Ok(_) => Err(invalid(section, key, format!("{key} must be at least {min}"))),
        Err(_) => Err(invalid(section, key, format!("{key} must be an integer"))),
    }
}

fn validate_cache(config: &dyn ConfigPort) -> Result<(), PerfError> {
    let backend = config
        .get_string("cache", "backend")
        .unwrap_or_else(|| "json".to_string());
    match backend.trim().to_lowercase().as_str() {
        "json" => {}
        "sqlite" => {
            if !cfg!(feature = "sqlite") {
                return Err(invalid(
                    "cache",
                    "backend",
                    "sqlite backend requires the sqlite feature",
                ));
            }
            require(config, "cache", "sqlite_path")?;
        }
        other => {
            return Err(invalid(
                "cache",
                "backend",
                format!("unknown backend \"{other}\" (expected json or sqlite)"),
            ))
        }
    }
    validate_min_int(config, "cache", "pool_size", 1)
}

fn validate_provider(config: &dyn ConfigPort) -> Result<(), PerfError> {
    let kind = config
        .get_string("provider", "kind")
        .unwrap_or_else(|| "yahoo".to_string());
    match kind.trim().to_lowercase().as_str() {
        "yahoo" => {}
        "csv" => {
            require(config, "provider", "csv_dir")?;
        }
        other => {
            return Err(invalid(
                "provider",
                "kind",
                format!("unknown provider \"{other}\" (expected yahoo or csv)"),
            ))
        }
    }
    validate_min_int(config, "provider", "timeout_secs", 1)
}

fn validate_compare(config: &dyn ConfigPort) -> Result<(), PerfError> {
    validate_min_int(config, "compare", "max_entries", 1)?;
    if let Some(token) = config.get_string("compare", "range") {
        token
            .parse::<Range>()
            .map_err(|e| invalid("compare", "range", e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn empty_config_passes() {
        assert!(validate_config(&FileConfigAdapter::empty()).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[cache]
backend = json
dir = .cache/market-data

[provider]
kind = csv
csv_dir = data
timeout_secs = 5

[compare]
max_entries = 6
range = 5y
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_backend_fails() {
        let config = make_config("[cache]\nbackend = redis\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigInvalid { key, .. } if key == "backend"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_backend_needs_path() {
        let config = make_config("[cache]\nbackend = sqlite\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigMissing { key, .. } if key == "sqlite_path"));
    }

    #[test]
    fn pool_size_zero_fails() {
        let config = make_config("[cache]\npool_size = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigInvalid { key, .. } if key == "pool_size"));
    }

    #[test]
    fn csv_provider_needs_dir() {
        let config = make_config("[provider]\nkind = csv\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigMissing { key, .. } if key == "csv_dir"));
    }

    #[test]
    fn unknown_provider_fails() {
        let config = make_config("[provider]\nkind = bloomberg\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigInvalid { key, .. } if key == "kind"));
    }

    #[test]
    fn non_numeric_timeout_fails() {
        let config = make_config("[provider]\ntimeout_secs = soon\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigInvalid { key, .. } if key == "timeout_secs"));
    }

    #[test]
    fn max_entries_zero_fails() {
        let config = make_config("[compare]\nmax_entries = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigInvalid { key, .. } if key == "max_entries"));
    }

    #[test]
    fn bad_default_range_fails() {
        let config = make_config("[compare]\nrange = 2y\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PerfError::ConfigInvalid { key, .. } if key == "range"));
    }
}
