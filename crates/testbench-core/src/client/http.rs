//! reqwest-backed analyzer client.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::wire::{self, HealthReport, RemoteBatchEntry};
use super::{AnalysisClient, BatchKind, ClientError, ClientResult, HealthProbe, ScenarioSource};
use crate::config::TestbenchConfig;
use crate::domain::{AnalysisResult, Conversation, Scenario, ScenarioCategory};

const NETWORK_ERROR: &str = "Network error - please check your connection";

/// HTTP client for the analyzer API
#[derive(Debug, Clone)]
pub struct HttpAnalyzerClient {
    config: TestbenchConfig,
    http: reqwest::Client,
}

impl HttpAnalyzerClient {
    /// Create a new client. The timeout is enforced per request in [`Self::send`].
    pub fn new(config: TestbenchConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpAnalyzerClient { config, http })
    }

    /// Create client from environment variables
    pub fn from_env() -> ClientResult<Self> {
        Self::new(TestbenchConfig::from_env())
    }

    pub fn config(&self) -> &TestbenchConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Issue one request and decode its JSON body.
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let url = self.url(path);
        debug!(%method, %url, "analyzer request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await.map_err(|e| {
                warn!(%url, error = %e, "analyzer request failed");
                ClientError::Network(NETWORK_ERROR.to_string())
            })?;

            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ClientError::Network(format!("{NETWORK_ERROR} ({e})")))?;

            if !status.is_success() {
                let body_message = serde_json::from_slice::<Value>(&bytes)
                    .ok()
                    .and_then(|v| v.as_object().and_then(wire::server_message));
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    message: wire::status_message(status.as_u16(), body_message.as_deref()),
                });
            }

            serde_json::from_slice::<Value>(&bytes)
                .map_err(|e| ClientError::Malformed(format!("response is not JSON: {e}")))
        };

        match tokio::time::timeout(self.config.timeout(), exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%url, timeout_ms = self.config.timeout_ms, "analyzer request timed out");
                Err(ClientError::Timeout {
                    after_ms: self.config.timeout_ms,
                })
            }
        }
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalyzerClient {
    async fn analyze(
        &self,
        conversation: &Conversation,
        expected: ScenarioCategory,
    ) -> ClientResult<AnalysisResult> {
        let body = serde_json::to_value(conversation)
            .map_err(|e| ClientError::Malformed(format!("failed to encode conversation: {e}")))?;
        let response = self.send(Method::POST, "analyze", Some(&body)).await?;
        wire::parse_analysis(response, expected)
    }

    async fn batch(&self, kind: BatchKind) -> ClientResult<Vec<RemoteBatchEntry>> {
        let response = self
            .send(Method::POST, &format!("testing/batch/{kind}"), None)
            .await?;
        wire::parse_batch(response)
    }
}

#[async_trait]
impl ScenarioSource for HttpAnalyzerClient {
    async fn scenarios(&self, category: ScenarioCategory) -> ClientResult<Vec<Scenario>> {
        let response = self
            .send(
                Method::GET,
                &format!("testing/scenarios?scenario_type={category}"),
                None,
            )
            .await?;
        wire::parse_scenarios(response, category)
    }
}

#[async_trait]
impl HealthProbe for HttpAnalyzerClient {
    async fn validate(&self) -> ClientResult<HealthReport> {
        let response = self.send(Method::GET, "testing/validate", None).await?;
        wire::parse_health(response)
    }
}
