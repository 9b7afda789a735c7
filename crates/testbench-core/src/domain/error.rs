//! Domain-level error taxonomy for the testbench.

use serde::{Deserialize, Serialize};

/// Errors produced while parsing a compliance score predicate such as `"> 90"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateParseError {
    #[error("score predicate must not be empty")]
    Empty,

    #[error("unknown comparison operator in score predicate: {0}")]
    UnknownOperator(String),

    #[error("invalid score threshold: {0}")]
    InvalidThreshold(String),
}

/// Testbench domain errors.
#[derive(Debug, thiserror::Error)]
pub enum TestbenchError {
    /// Local precondition failure; no dispatch was attempted.
    #[error("input text is empty")]
    EmptyInput,

    #[error("scenario catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("analysis timed out after {after_ms} ms")]
    AnalysisTimeout { after_ms: u64 },

    #[error("analysis failed: {0}")]
    AnalysisFailure(String),

    #[error("validation unavailable: {0}")]
    ValidationUnavailable(String),

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}

/// Result type for testbench domain operations.
pub type Result<T> = std::result::Result<T, TestbenchError>;

/// Class of an in-band analysis failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Failure,
}

/// An analysis failure carried as data on the record it affects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Failure,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
        }
    }
}

impl From<&TestbenchError> for ErrorEnvelope {
    fn from(err: &TestbenchError) -> Self {
        match err {
            TestbenchError::AnalysisTimeout { .. } => ErrorEnvelope::timeout(err.to_string()),
            _ => ErrorEnvelope::failure(err.to_string()),
        }
    }
}
