use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. Nothing useful can run without the artifacts, so callers treat
/// these as fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading {what} artifact {path}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing {what} artifact {path}: {source}")]
    Parse {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {what} artifact: {reason}")]
    Invalid { what: &'static str, reason: String },
    #[error("missing setting {0}")]
    MissingSetting(&'static str),
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("feature schema mismatch: model expects [{expected}], record has [{found}]")]
    SchemaMismatch { expected: String, found: String },
    #[error("model returned invalid output: {0}")]
    InvalidOutput(String),
}

impl PredictError {
    pub fn schema_mismatch(expected: &[String], found: &[String]) -> Self {
        Self::SchemaMismatch {
            expected: expected.join(", "),
            found: found.join(", "),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("explainability unsupported for {model} model: {reason}")]
    Unsupported { model: String, reason: String },
    #[error(transparent)]
    Predict(#[from] PredictError),
}

/// Feedback submission failures. Always recoverable; the current prediction stays put.
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback store rejected credentials (http {0})")]
    Auth(u16),
    #[error("feedback request failed: {0}")]
    Network(String),
    #[error("feedback store error: {0}")]
    Remote(String),
    #[error("feedback storage failed: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("feedback submission is disabled")]
    Disabled,
}

impl From<reqwest::Error> for FeedbackError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
