//! Domain error types.
//!
//! The engine itself never fails: missing data, infeasible constraints and
//! degenerate inputs are recovered locally. These errors only cover the
//! boundary, where files are read, configuration is parsed and candidate
//! records are validated before they reach the engine.

/// Top-level error type for folioforge.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error("invalid candidate {symbol}: {reason}")]
    InvalidCandidate { symbol: String, reason: String },

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FolioError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        FolioError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        let code: u8 = match err {
            FolioError::Io(_) => 1,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. } => 2,
            FolioError::Data { .. } => 3,
            FolioError::InvalidCandidate { .. } | FolioError::DuplicateSymbol(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}
