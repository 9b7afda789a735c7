//! Boundary to the remote analysis service.
//!
//! Three narrow traits cover the endpoints the core consumes:
//! - [`AnalysisClient`]: `analyze` plus the server-side batch variant
//! - [`ScenarioSource`]: the remote scenario catalog
//! - [`HealthProbe`]: the optional validation endpoint
//!
//! [`HttpAnalyzerClient`] implements all three over reqwest; in-memory fakes
//! live in [`crate::fakes`].

pub mod http;
pub mod wire;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{AnalysisResult, Conversation, Scenario, ScenarioCategory, TestbenchError};

pub use http::HttpAnalyzerClient;
pub use wire::{HealthReport, RemoteBatchEntry};

/// Transport-level failures. Mapped onto [`TestbenchError`] at the executor boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request rejected by server: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for TestbenchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout { after_ms } => TestbenchError::AnalysisTimeout { after_ms },
            other => TestbenchError::AnalysisFailure(other.to_string()),
        }
    }
}

/// Server-side batch flavours.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Emotions,
    Compliance,
}

impl BatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Emotions => "emotions",
            BatchKind::Compliance => "compliance",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ScenarioCategory> for BatchKind {
    fn from(category: ScenarioCategory) -> Self {
        match category {
            ScenarioCategory::Emotion => BatchKind::Emotions,
            ScenarioCategory::Compliance => BatchKind::Compliance,
        }
    }
}

/// The analyzer itself.
///
/// Guarantees:
/// - one call is one request; no retries
/// - calls never mutate caller state; they return or fail
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Analyze a conversation. The conversation is the request body verbatim;
    /// `expected` names the result shape the request asks for.
    async fn analyze(
        &self,
        conversation: &Conversation,
        expected: ScenarioCategory,
    ) -> ClientResult<AnalysisResult>;

    /// Run a batch on the server and return its per-item entries.
    async fn batch(&self, kind: BatchKind) -> ClientResult<Vec<RemoteBatchEntry>>;
}

/// Backing source of the scenario catalog.
#[async_trait]
pub trait ScenarioSource: Send + Sync {
    async fn scenarios(&self, category: ScenarioCategory) -> ClientResult<Vec<Scenario>>;
}

/// The system-health endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn validate(&self) -> ClientResult<HealthReport>;
}
