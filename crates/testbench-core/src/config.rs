//! Runtime configuration for the testbench.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Analyzer deployment used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://chat-emotion-and-compliance-analyzer.onrender.com/api";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Testbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestbenchConfig {
    /// Analyzer API base URL, without trailing slash
    pub base_url: String,
    /// Timeout applied to every analyzer request
    pub timeout_ms: u64,
    /// Concurrent dispatches during a local batch (1 = sequential)
    pub batch_concurrency: usize,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for TestbenchConfig {
    fn default() -> Self {
        TestbenchConfig {
            base_url: std::env::var("ANALYZER_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout_ms: std::env::var("ANALYZER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            batch_concurrency: std::env::var("TESTBENCH_BATCH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1),
            user_agent: format!("analyzer-testbench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TestbenchConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific analyzer deployment, ignoring the environment
    pub fn new(base_url: &str) -> Self {
        TestbenchConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            batch_concurrency: 1,
            user_agent: format!("analyzer-testbench/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set batch concurrency; values below 1 are clamped to 1
    pub fn with_batch_concurrency(mut self, n: usize) -> Self {
        self.batch_concurrency = n.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let config = TestbenchConfig::new("http://localhost:3000/api/");
        assert_eq!(config.base_url, "http://localhost:3000/api");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.batch_concurrency, 1);
        assert!(config.user_agent.starts_with("analyzer-testbench/"));
    }

    #[test]
    fn test_builders() {
        let config = TestbenchConfig::new(DEFAULT_BASE_URL)
            .with_timeout_ms(250)
            .with_batch_concurrency(0);
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.batch_concurrency, 1);
    }
}
