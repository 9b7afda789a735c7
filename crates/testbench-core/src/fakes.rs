//! In-memory fakes for the client traits (testing only)
//!
//! [`ScriptedAnalyzer`] implements [`AnalysisClient`], [`ScenarioSource`] and
//! [`HealthProbe`] from scripted responses and records every analyze call.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::client::{
    AnalysisClient, BatchKind, ClientError, ClientResult, HealthProbe, HealthReport,
    RemoteBatchEntry, ScenarioSource,
};
use crate::domain::{
    AnalysisResult, ComplianceAnalysis, ComplianceSummary, Conversation, Emotion,
    EmotionAnalysis, MessageEmotion, Scenario, ScenarioCategory, Sender,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Emotion-shaped result with one customer message.
pub fn emotion_result(emotion: Emotion, confidence: f64) -> AnalysisResult {
    AnalysisResult::Emotion(EmotionAnalysis {
        messages: vec![MessageEmotion {
            sender: Sender::Customer,
            text: String::new(),
            emotion,
            confidence,
        }],
    })
}

/// Compliance-shaped result with an empty rule set.
pub fn compliance_result(overall_score: f64) -> AnalysisResult {
    AnalysisResult::Compliance(ComplianceAnalysis {
        summary: ComplianceSummary::default(),
        overall_score,
    })
}

/// Scripted analyzer backed by in-memory tables.
///
/// `analyze` responses are keyed by the conversation's first customer
/// message text; unknown texts get the default response, or a
/// [`ClientError::Malformed`] when none is set.
#[derive(Debug, Default)]
pub struct ScriptedAnalyzer {
    responses: Mutex<HashMap<String, ClientResult<AnalysisResult>>>,
    default_response: Mutex<Option<ClientResult<AnalysisResult>>>,
    scenarios: Mutex<HashMap<ScenarioCategory, ClientResult<Vec<Scenario>>>>,
    batches: Mutex<HashMap<BatchKind, ClientResult<Vec<RemoteBatchEntry>>>>,
    health: Mutex<Option<ClientResult<HealthReport>>>,
    calls: Mutex<Vec<Conversation>>,
    requested_shapes: Mutex<Vec<ScenarioCategory>>,
    batch_calls: Mutex<Vec<BatchKind>>,
    gated: bool,
    entered: Notify,
    gate: Notify,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for conversations whose first customer message is `text`.
    pub fn with_response(self, text: &str, response: ClientResult<AnalysisResult>) -> Self {
        lock(&self.responses).insert(text.to_string(), response);
        self
    }

    pub fn with_emotion(self, text: &str, emotion: Emotion, confidence: f64) -> Self {
        self.with_response(text, Ok(emotion_result(emotion, confidence)))
    }

    pub fn with_default(self, response: ClientResult<AnalysisResult>) -> Self {
        *lock(&self.default_response) = Some(response);
        self
    }

    pub fn with_scenarios(
        self,
        category: ScenarioCategory,
        scenarios: ClientResult<Vec<Scenario>>,
    ) -> Self {
        lock(&self.scenarios).insert(category, scenarios);
        self
    }

    pub fn with_batch(self, kind: BatchKind, entries: ClientResult<Vec<RemoteBatchEntry>>) -> Self {
        lock(&self.batches).insert(kind, entries);
        self
    }

    pub fn with_health(self, report: ClientResult<HealthReport>) -> Self {
        *lock(&self.health) = Some(report);
        self
    }

    /// Hold every analyze call until [`Self::release`] is called once per call.
    pub fn gated(mut self) -> Self {
        self.gated = true;
        self
    }

    /// Wait until an analyze call has been recorded and is held at the gate.
    pub async fn wait_for_call(&self) {
        self.entered.notified().await;
    }

    /// Let one held analyze call proceed.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Conversations received by `analyze`, in call order.
    pub fn calls(&self) -> Vec<Conversation> {
        lock(&self.calls).clone()
    }

    /// Result shape each analyze call asked for, in call order.
    pub fn requested_shapes(&self) -> Vec<ScenarioCategory> {
        lock(&self.requested_shapes).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn batch_calls(&self) -> Vec<BatchKind> {
        lock(&self.batch_calls).clone()
    }

    fn key_of(conversation: &Conversation) -> String {
        conversation
            .messages
            .iter()
            .find(|m| m.sender == Sender::Customer)
            .or_else(|| conversation.messages.first())
            .map(|m| m.text.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedAnalyzer {
    async fn analyze(
        &self,
        conversation: &Conversation,
        expected: ScenarioCategory,
    ) -> ClientResult<AnalysisResult> {
        lock(&self.calls).push(conversation.clone());
        lock(&self.requested_shapes).push(expected);

        if self.gated {
            self.entered.notify_one();
            self.gate.notified().await;
        }

        let key = Self::key_of(conversation);
        if let Some(response) = lock(&self.responses).get(&key) {
            return response.clone();
        }
        lock(&self.default_response).clone().unwrap_or_else(|| {
            Err(ClientError::Malformed(format!(
                "no scripted response for '{key}'"
            )))
        })
    }

    async fn batch(&self, kind: BatchKind) -> ClientResult<Vec<RemoteBatchEntry>> {
        lock(&self.batch_calls).push(kind);
        lock(&self.batches)
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl ScenarioSource for ScriptedAnalyzer {
    async fn scenarios(&self, category: ScenarioCategory) -> ClientResult<Vec<Scenario>> {
        lock(&self.scenarios)
            .get(&category)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl HealthProbe for ScriptedAnalyzer {
    async fn validate(&self) -> ClientResult<HealthReport> {
        lock(&self.health).clone().unwrap_or_else(|| {
            Err(ClientError::Status {
                status: 404,
                message: "Resource not found".to_string(),
            })
        })
    }
}
