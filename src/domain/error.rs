//! Domain error types.

/// Top-level error type for spytrader.
#[derive(Debug, thiserror::Error)]
pub enum SpytraderError {
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

    #[error("invalid data in {source_name} at row {row} (line {line}): {reason}")]
    DataValidation {
        source_name: String,
        row: usize,
        line: u64,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {symbol} in the requested date range")]
    NoData { symbol: String },

    #[error("report error writing {path}: {reason}")]
    Report { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SpytraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SpytraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SpytraderError> for std::process::ExitCode {
    fn from(err: &SpytraderError) -> Self {
        let code: u8 = match err {
            SpytraderError::Io(_) | SpytraderError::Report { .. } => 1,
            SpytraderError::ConfigParse { .. }
            | SpytraderError::ConfigMissing { .. }
            | SpytraderError::ConfigInvalid { .. } => 2,
            SpytraderError::DataValidation { .. }
            | SpytraderError::DataSource { .. }
            | SpytraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_validation_message_names_row() {
        let err = SpytraderError::DataValidation {
            source_name: "spy.csv".into(),
            row: 3,
            line: 4,
            reason: "invalid close value".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid data in spy.csv at row 3 (line 4): invalid close value"
        );
    }

    #[test]
    fn invalid_helper_builds_config_invalid() {
        let err = SpytraderError::invalid("sma_crossover", "slow_period", "too small");
        assert!(matches!(
            err,
            SpytraderError::ConfigInvalid { ref section, ref key, .. }
                if section == "sma_crossover" && key == "slow_period"
        ));
    }

    #[test]
    fn exit_codes_by_error_class() {
        use std::process::ExitCode;

        let report = SpytraderError::Report {
            path: "out.csv".into(),
            reason: "denied".into(),
        };
        let config = SpytraderError::ConfigMissing {
            section: "strategy".into(),
            key: "kind".into(),
        };
        let data = SpytraderError::NoData {
            symbol: "SPY".into(),
        };
        assert_eq!(ExitCode::from(&report), ExitCode::from(1));
        assert_eq!(ExitCode::from(&config), ExitCode::from(2));
        assert_eq!(ExitCode::from(&data), ExitCode::from(5));
    }
}
