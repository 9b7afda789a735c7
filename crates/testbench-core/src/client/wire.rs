//! JSON wire formats of the analyzer API.
//!
//! Responses arrive wrapped as `{ "success": bool, "data": ... }`. The
//! envelope is unwrapped here and the payload converted into domain types,
//! so nothing past this module touches raw JSON shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::{ClientError, ClientResult};
use crate::domain::{
    AnalysisResult, ComplianceAnalysis, ComplianceSummary, Conversation, Emotion,
    EmotionAnalysis, Expectation, Message, MessageEmotion, Scenario, ScenarioCategory,
    ScenarioInput, ScorePredicate, Sender, PLACEHOLDER_AGENT, PLACEHOLDER_CUSTOMER,
};

const CUSTOMER_EMOTIONS_KEY: &str = "customer_emotions";
const NEGATIVE_EMOTIONS_KEY: &str = "negative_emotions_detected";

/// Strip the `{success, data}` envelope.
///
/// A body without an envelope is returned as-is. `success: false` becomes
/// [`ClientError::Rejected`] carrying the server's message.
pub fn unwrap_envelope(body: Value) -> ClientResult<Value> {
    let Value::Object(mut obj) = body else {
        return Ok(body);
    };

    if obj.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ClientError::Rejected(
            server_message(&obj).unwrap_or_else(|| "request failed".to_string()),
        ));
    }

    match obj.remove("data") {
        Some(data) => Ok(data),
        None => Ok(Value::Object(obj)),
    }
}

/// The human-readable message a server put into an error body, if any.
pub fn server_message(obj: &Map<String, Value>) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Text shown for a non-2xx status, optionally refined by the body message.
pub fn status_message(status: u16, body_message: Option<&str>) -> String {
    match status {
        401 => "Unauthorized access".to_string(),
        403 => "Access forbidden".to_string(),
        404 => "Resource not found".to_string(),
        422 => body_message.unwrap_or("Validation error").to_string(),
        500 => "Server error occurred".to_string(),
        _ => body_message.unwrap_or("An error occurred").to_string(),
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireMessageEmotion {
    sender: Sender,
    text: String,
    emotion: String,
    confidence: f64,
}

/// Parse an `analyze` response body into a single-shape result.
///
/// The compliance block is looked up under `analysis` first, then at the top
/// of `data`. A reply carrying both blocks is resolved by `expected`, the
/// kind of request that was sent; a reply carrying one block yields that
/// shape whatever was expected.
pub fn parse_analysis(body: Value, expected: ScenarioCategory) -> ClientResult<AnalysisResult> {
    let data = unwrap_envelope(body)?;
    let Value::Object(data) = data else {
        return Err(ClientError::Malformed(
            "analysis payload is not an object".to_string(),
        ));
    };

    let compliance_source = data
        .get("analysis")
        .and_then(Value::as_object)
        .filter(|a| a.contains_key("compliance_summary"))
        .or_else(|| Some(&data).filter(|d| d.contains_key("compliance_summary")));
    let messages = data.get("messages");

    match (messages, compliance_source, expected) {
        (Some(messages), Some(_), ScenarioCategory::Emotion) | (Some(messages), None, _) => {
            parse_messages(messages.clone()).map(AnalysisResult::Emotion)
        }
        (_, Some(source), _) => parse_compliance(source).map(AnalysisResult::Compliance),
        (None, None, _) => Err(ClientError::Malformed(
            "response carries neither messages nor compliance_summary".to_string(),
        )),
    }
}

fn parse_messages(value: Value) -> ClientResult<EmotionAnalysis> {
    let wire: Vec<WireMessageEmotion> = serde_json::from_value(value)
        .map_err(|e| ClientError::Malformed(format!("invalid messages: {e}")))?;

    let messages = wire
        .into_iter()
        .map(|m| {
            let emotion = parse_emotion(&m.emotion)?;
            if !(0.0..=1.0).contains(&m.confidence) {
                return Err(ClientError::Malformed(format!(
                    "confidence {} outside 0..=1",
                    m.confidence
                )));
            }
            Ok(MessageEmotion {
                sender: m.sender,
                text: m.text,
                emotion,
                confidence: m.confidence,
            })
        })
        .collect::<ClientResult<Vec<_>>>()?;

    Ok(EmotionAnalysis { messages })
}

/// Parse an object holding `compliance_summary` and `overall_compliance_score`.
pub fn parse_compliance(obj: &Map<String, Value>) -> ClientResult<ComplianceAnalysis> {
    let summary_obj = obj
        .get("compliance_summary")
        .and_then(Value::as_object)
        .ok_or_else(|| ClientError::Malformed("compliance_summary is not an object".to_string()))?;

    let mut summary = ComplianceSummary::default();
    for (key, value) in summary_obj {
        match key.as_str() {
            CUSTOMER_EMOTIONS_KEY => {
                let labels = value.as_array().ok_or_else(|| {
                    ClientError::Malformed(format!("{CUSTOMER_EMOTIONS_KEY} is not an array"))
                })?;
                for label in labels {
                    let label = label.as_str().ok_or_else(|| {
                        ClientError::Malformed(format!(
                            "non-string entry in {CUSTOMER_EMOTIONS_KEY}"
                        ))
                    })?;
                    summary.customer_emotions.push(parse_emotion(label)?);
                }
            }
            NEGATIVE_EMOTIONS_KEY => {
                summary.negative_emotions_detected = value.as_bool().unwrap_or(false);
            }
            rule => {
                if let Some(passed) = value.as_bool() {
                    summary.rules.insert(rule.to_string(), passed);
                }
            }
        }
    }

    let overall_score = obj
        .get("overall_compliance_score")
        .or_else(|| obj.get("score"))
        .and_then(Value::as_f64)
        .ok_or_else(|| ClientError::Malformed("missing overall_compliance_score".to_string()))?;

    if !(0.0..=100.0).contains(&overall_score) {
        return Err(ClientError::Malformed(format!(
            "overall_compliance_score {overall_score} outside 0..=100"
        )));
    }

    Ok(ComplianceAnalysis {
        summary,
        overall_score,
    })
}

fn parse_emotion(label: &str) -> ClientResult<Emotion> {
    label
        .parse::<Emotion>()
        .map_err(|e| ClientError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// scenarios
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireConversation {
    messages: Vec<Message>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    agent_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireScenario {
    #[serde(default)]
    id: Option<Value>,
    name: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    conversation: Option<WireConversation>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
    #[serde(default)]
    expected: Option<String>,
    #[serde(default, alias = "expectedScore")]
    expected_score: Option<String>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    agent_name: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Parse a scenario listing. Entries without any input are skipped.
pub fn parse_scenarios(body: Value, category: ScenarioCategory) -> ClientResult<Vec<Scenario>> {
    let data = unwrap_envelope(body)?;
    let Value::Array(items) = data else {
        return Err(ClientError::Malformed(
            "scenario listing is not an array".to_string(),
        ));
    };

    let mut scenarios = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let wire: WireScenario = match serde_json::from_value(item) {
            Ok(w) => w,
            Err(e) => {
                warn!(category = %category, index, error = %e, "skipping unreadable scenario");
                continue;
            }
        };
        if let Some(scenario) = scenario_from_wire(wire, category, index) {
            scenarios.push(scenario);
        }
    }
    Ok(scenarios)
}

fn scenario_from_wire(
    wire: WireScenario,
    category: ScenarioCategory,
    index: usize,
) -> Option<Scenario> {
    let id = match &wire.id {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("{category}-{index}"),
    };

    let input = if let Some(conv) = wire.conversation {
        ScenarioInput::Conversation {
            conversation: Conversation::new(
                conv.messages,
                conv.customer_name
                    .or(wire.customer_name)
                    .unwrap_or_else(|| PLACEHOLDER_CUSTOMER.to_string()),
                conv.agent_name
                    .or(wire.agent_name)
                    .unwrap_or_else(|| PLACEHOLDER_AGENT.to_string()),
            ),
        }
    } else if let Some(messages) = wire.messages {
        ScenarioInput::Conversation {
            conversation: Conversation::new(
                messages,
                wire.customer_name
                    .unwrap_or_else(|| PLACEHOLDER_CUSTOMER.to_string()),
                wire.agent_name
                    .unwrap_or_else(|| PLACEHOLDER_AGENT.to_string()),
            ),
        }
    } else if let Some(text) = wire.text {
        ScenarioInput::Text {
            text,
            customer_name: wire.customer_name,
            agent_name: wire.agent_name,
        }
    } else {
        warn!(
            category = %category,
            scenario = %wire.name,
            "skipping scenario without text or conversation"
        );
        return None;
    };

    let expected = parse_expectation(
        category,
        wire.expected.as_deref(),
        wire.expected_score.as_deref(),
    );
    if expected.is_none() && (wire.expected.is_some() || wire.expected_score.is_some()) {
        warn!(scenario = %wire.name, "scenario expectation not understood; running without one");
    }

    Some(Scenario {
        id,
        name: wire.name,
        category,
        input,
        expected,
        metadata: Value::Object(wire.extra),
    })
}

fn parse_expectation(
    category: ScenarioCategory,
    expected: Option<&str>,
    expected_score: Option<&str>,
) -> Option<Expectation> {
    if let Some(score) = expected_score {
        if let Ok(p) = score.parse::<ScorePredicate>() {
            return Some(Expectation::ComplianceScore(p));
        }
    }
    let expected = expected?;
    match category {
        ScenarioCategory::Emotion => expected.parse::<Emotion>().ok().map(Expectation::Emotion),
        ScenarioCategory::Compliance => expected
            .parse::<ScorePredicate>()
            .ok()
            .map(Expectation::ComplianceScore)
            .or_else(|| expected.parse::<Emotion>().ok().map(Expectation::Emotion)),
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Payload of the validation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    #[serde(alias = "emotionAccuracy")]
    pub emotion_accuracy: f64,
    #[serde(alias = "complianceAccuracy")]
    pub compliance_accuracy: f64,
    #[serde(alias = "averageResponseTime")]
    pub average_response_time: f64,
}

pub fn parse_health(body: Value) -> ClientResult<HealthReport> {
    let data = unwrap_envelope(body)?;
    serde_json::from_value(data)
        .map_err(|e| ClientError::Malformed(format!("invalid validation payload: {e}")))
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

/// One entry of a server-side batch, as sent.
///
/// Emotion entries carry `expected`/`result`/`confidence`; compliance entries
/// carry a score and optionally the full summary. Normalised into run records
/// by the executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemoteBatchEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default, alias = "expectedScore")]
    pub expected_score: Option<String>,
    #[serde(default, alias = "score")]
    pub overall_compliance_score: Option<f64>,
    #[serde(default)]
    pub compliance_summary: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteBatchEntry {
    /// Expectation of this entry, interpreted for the batch kind.
    pub fn expectation(&self, category: ScenarioCategory) -> Option<Expectation> {
        parse_expectation(
            category,
            self.expected.as_deref(),
            self.expected_score.as_deref(),
        )
    }

    /// Analysis result carried by the entry.
    pub fn analysis(&self) -> ClientResult<AnalysisResult> {
        if let Some(err) = &self.error {
            return Err(ClientError::Rejected(err.clone()));
        }

        if let Some(score) = self.overall_compliance_score {
            let mut obj = Map::new();
            obj.insert(
                "compliance_summary".to_string(),
                Value::Object(self.compliance_summary.clone().unwrap_or_default()),
            );
            obj.insert("overall_compliance_score".to_string(), Value::from(score));
            return parse_compliance(&obj).map(AnalysisResult::Compliance);
        }

        let label = self.result.as_deref().ok_or_else(|| {
            ClientError::Malformed(format!("batch entry '{}' has no result", self.name))
        })?;
        let confidence = self.confidence.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ClientError::Malformed(format!(
                "confidence {confidence} outside 0..=1"
            )));
        }
        Ok(AnalysisResult::Emotion(EmotionAnalysis {
            messages: vec![MessageEmotion {
                sender: Sender::Customer,
                text: self.text.clone().unwrap_or_default(),
                emotion: parse_emotion(label)?,
                confidence,
            }],
        }))
    }
}

pub fn parse_batch(body: Value) -> ClientResult<Vec<RemoteBatchEntry>> {
    let data = unwrap_envelope(body)?;
    let data = match data {
        Value::Object(mut obj) => obj.remove("results").unwrap_or(Value::Object(obj)),
        other => other,
    };
    serde_json::from_value(data)
        .map_err(|e| ClientError::Malformed(format!("invalid batch payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_unwraps_data() {
        let data = unwrap_envelope(json!({ "success": true, "data": [1, 2] })).expect("unwrap");
        assert_eq!(data, json!([1, 2]));
    }

    #[test]
    fn test_envelope_rejected_carries_message() {
        let err = unwrap_envelope(json!({ "success": false, "message": "quota exceeded" }))
            .expect_err("rejected");
        assert_eq!(err, ClientError::Rejected("quota exceeded".to_string()));
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(status_message(404, None), "Resource not found");
        assert_eq!(status_message(422, Some("text too long")), "text too long");
        assert_eq!(
            status_message(500, Some("ignored")),
            "Server error occurred"
        );
        assert_eq!(status_message(418, None), "An error occurred");
    }

    #[test]
    fn test_parse_emotion_shape() {
        let body = json!({
            "success": true,
            "data": {
                "messages": [
                    { "sender": "customer", "text": "I'm terrified my account was hacked",
                      "emotion": "fear", "confidence": 0.91 }
                ]
            }
        });
        let result = parse_analysis(body, ScenarioCategory::Emotion).expect("parse");
        let emotion = result.as_emotion().expect("emotion shape");
        assert_eq!(emotion.top_emotion(), Some(Emotion::Fear));
    }

    fn dual_shape_body() -> Value {
        json!({
            "success": true,
            "data": {
                "messages": [
                    { "sender": "customer", "text": "I'm terrified my account was hacked",
                      "emotion": "fear", "confidence": 0.93 }
                ],
                "analysis": {
                    "compliance_summary": { "greeting": false, "negative_emotions_detected": true },
                    "overall_compliance_score": 20
                }
            }
        })
    }

    #[test]
    fn test_dual_shape_reply_follows_emotion_request() {
        let result = parse_analysis(dual_shape_body(), ScenarioCategory::Emotion).expect("parse");
        let emotion = result.as_emotion().expect("emotion shape");
        assert_eq!(emotion.top_emotion(), Some(Emotion::Fear));
        assert_eq!(emotion.top_message().map(|m| m.confidence), Some(0.93));
    }

    #[test]
    fn test_dual_shape_reply_follows_compliance_request() {
        let result =
            parse_analysis(dual_shape_body(), ScenarioCategory::Compliance).expect("parse");
        assert_eq!(result.as_compliance().map(|c| c.overall_score), Some(20.0));
    }

    #[test]
    fn test_parse_compliance_shape_under_analysis() {
        let body = json!({
            "success": true,
            "data": {
                "messages": [
                    { "sender": "agent", "text": "Whatever.",
                      "emotion": "anger", "confidence": 0.5 }
                ],
                "analysis": {
                    "compliance_summary": {
                        "greeting": false,
                        "empathy": false,
                        "customer_emotions": ["anger", "anger"],
                        "negative_emotions_detected": true
                    },
                    "overall_compliance_score": 12
                }
            }
        });
        let result = parse_analysis(body, ScenarioCategory::Compliance).expect("parse");
        let compliance = result.as_compliance().expect("compliance shape");
        assert_eq!(compliance.overall_score, 12.0);
        assert_eq!(compliance.summary.rules.len(), 2);
        assert!(compliance.summary.negative_emotions_detected);
        assert_eq!(
            compliance.summary.customer_emotions,
            vec![Emotion::Anger, Emotion::Anger]
        );
    }

    #[test]
    fn test_parse_compliance_at_top_level() {
        let body = json!({
            "compliance_summary": { "resolution": true },
            "overall_compliance_score": 95.5
        });
        // Only one block present: the request kind does not matter.
        let result = parse_analysis(body, ScenarioCategory::Emotion).expect("parse");
        assert_eq!(result.as_compliance().map(|c| c.overall_score), Some(95.5));
    }

    #[test]
    fn test_parse_rejects_unknown_shape_and_labels() {
        assert!(matches!(
            parse_analysis(json!({ "data": { "foo": 1 } }), ScenarioCategory::Emotion),
            Err(ClientError::Malformed(_))
        ));
        let bad_label = json!({ "data": { "messages": [
            { "sender": "customer", "text": "meh", "emotion": "neutral", "confidence": 0.5 }
        ] } });
        assert!(matches!(
            parse_analysis(bad_label, ScenarioCategory::Emotion),
            Err(ClientError::Malformed(_))
        ));
        let bad_conf = json!({ "data": { "messages": [
            { "sender": "customer", "text": "meh", "emotion": "joy", "confidence": 7.0 }
        ] } });
        assert!(matches!(
            parse_analysis(bad_conf, ScenarioCategory::Emotion),
            Err(ClientError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_scenarios_mixed_inputs() {
        let body = json!({
            "success": true,
            "data": [
                { "id": 7, "name": "Hacked", "text": "I'm terrified",
                  "expected": "fear", "difficulty": "easy" },
                { "name": "No input", "expected": "joy" },
                { "name": "Rude", "messages": [ { "sender": "agent", "text": "Whatever." } ],
                  "expectedScore": "< 30" }
            ]
        });
        let scenarios = parse_scenarios(body, ScenarioCategory::Emotion).expect("parse");
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].id, "7");
        assert_eq!(scenarios[0].expected_emotion(), Some(Emotion::Fear));
        assert_eq!(scenarios[0].metadata["difficulty"], "easy");
        assert_eq!(scenarios[1].id, "emotion-2");
        assert!(scenarios[1].score_predicate().is_some());
        assert_eq!(
            scenarios[1].conversation().customer_name,
            PLACEHOLDER_CUSTOMER
        );
    }

    #[test]
    fn test_parse_health_camel_case() {
        let body = json!({
            "success": true,
            "data": {
                "emotionAccuracy": 87.5,
                "complianceAccuracy": 91,
                "averageResponseTime": 420
            }
        });
        let report = parse_health(body).expect("parse");
        assert_eq!(report.emotion_accuracy, 87.5);
        assert_eq!(report.average_response_time, 420.0);
    }

    #[test]
    fn test_batch_entry_emotion_analysis() {
        let entries = parse_batch(json!({
            "success": true,
            "data": [
                { "name": "Joyful", "text": "Best day ever", "expected": "joy",
                  "result": "joy", "correct": true, "confidence": 0.97 }
            ]
        }))
        .expect("parse");
        assert_eq!(entries.len(), 1);
        let analysis = entries[0].analysis().expect("analysis");
        assert_eq!(
            analysis.as_emotion().and_then(|e| e.top_emotion()),
            Some(Emotion::Joy)
        );
        assert_eq!(
            entries[0].expectation(ScenarioCategory::Emotion),
            Some(Expectation::Emotion(Emotion::Joy))
        );
    }

    #[test]
    fn test_batch_entry_compliance_analysis() {
        let entry = RemoteBatchEntry {
            name: "Perfect".to_string(),
            expected_score: Some("> 90".to_string()),
            overall_compliance_score: Some(96.0),
            ..Default::default()
        };
        let analysis = entry.analysis().expect("analysis");
        assert_eq!(
            analysis.as_compliance().map(|c| c.overall_score),
            Some(96.0)
        );
    }
}
