//! Predefined test inputs and their expected outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::conversation::{Conversation, Message, PLACEHOLDER_AGENT, PLACEHOLDER_CUSTOMER};
use super::emotion::Emotion;
use super::error::PredicateParseError;

/// Catalog category a scenario belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCategory {
    Emotion,
    Compliance,
}

impl ScenarioCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioCategory::Emotion => "emotion",
            ScenarioCategory::Compliance => "compliance",
        }
    }
}

impl fmt::Display for ScenarioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emotion" | "emotions" => Ok(ScenarioCategory::Emotion),
            "compliance" => Ok(ScenarioCategory::Compliance),
            other => Err(format!("unknown scenario category: {other}")),
        }
    }
}

/// Comparison operator of a [`ScorePredicate`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl ScoreOp {
    fn symbol(&self) -> &'static str {
        match self {
            ScoreOp::Gt => ">",
            ScoreOp::Ge => ">=",
            ScoreOp::Lt => "<",
            ScoreOp::Le => "<=",
            ScoreOp::Eq => "==",
        }
    }
}

/// Expected compliance score range, written as `"> 90"` or `"< 30"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "String", into = "String")]
pub struct ScorePredicate {
    pub op: ScoreOp,
    pub threshold: f64,
}

impl ScorePredicate {
    pub fn new(op: ScoreOp, threshold: f64) -> Self {
        Self { op, threshold }
    }

    /// Whether `score` satisfies the predicate.
    pub fn matches(&self, score: f64) -> bool {
        match self.op {
            ScoreOp::Gt => score > self.threshold,
            ScoreOp::Ge => score >= self.threshold,
            ScoreOp::Lt => score < self.threshold,
            ScoreOp::Le => score <= self.threshold,
            ScoreOp::Eq => (score - self.threshold).abs() < f64::EPSILON,
        }
    }
}

impl FromStr for ScorePredicate {
    type Err = PredicateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PredicateParseError::Empty);
        }

        // Two-character operators first so ">=" is not read as ">".
        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (ScoreOp::Ge, rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (ScoreOp::Le, rest)
        } else if let Some(rest) = s.strip_prefix("==") {
            (ScoreOp::Eq, rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (ScoreOp::Gt, rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (ScoreOp::Lt, rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (ScoreOp::Eq, rest)
        } else {
            return Err(PredicateParseError::UnknownOperator(s.to_string()));
        };

        let rest = rest.trim().trim_end_matches('%').trim();
        let threshold = rest
            .parse::<f64>()
            .map_err(|_| PredicateParseError::InvalidThreshold(rest.to_string()))?;

        Ok(Self { op, threshold })
    }
}

impl TryFrom<String> for ScorePredicate {
    type Error = PredicateParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ScorePredicate> for String {
    fn from(p: ScorePredicate) -> Self {
        p.to_string()
    }
}

impl fmt::Display for ScorePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.symbol(), self.threshold)
    }
}

/// What a scenario is expected to produce.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", content = "value")]
pub enum Expectation {
    /// Top customer emotion must equal this label.
    Emotion(Emotion),

    /// Overall compliance score must satisfy this predicate.
    ComplianceScore(ScorePredicate),
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Emotion(e) => write!(f, "{e}"),
            Expectation::ComplianceScore(p) => write!(f, "score {p}"),
        }
    }
}

/// The input half of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioInput {
    /// A single customer utterance.
    Text {
        text: String,
        customer_name: Option<String>,
        agent_name: Option<String>,
    },

    /// A pre-built multi-turn conversation.
    Conversation { conversation: Conversation },
}

/// A predefined test input with a known expected outcome.
///
/// Scenarios are immutable once loaded; the executor only reads them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub category: ScenarioCategory,
    pub input: ScenarioInput,
    pub expected: Option<Expectation>,
    /// Extra fields sent by the catalog source, kept verbatim.
    pub metadata: serde_json::Value,
}

impl Scenario {
    /// Single-text emotion scenario.
    pub fn emotion(
        id: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
        expected: Option<Emotion>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: ScenarioCategory::Emotion,
            input: ScenarioInput::Text {
                text: text.into(),
                customer_name: None,
                agent_name: None,
            },
            expected: expected.map(Expectation::Emotion),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    /// Multi-turn compliance scenario.
    pub fn compliance(
        id: impl Into<String>,
        name: impl Into<String>,
        conversation: Conversation,
        expected: Option<ScorePredicate>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: ScenarioCategory::Compliance,
            input: ScenarioInput::Conversation { conversation },
            expected: expected.map(Expectation::ComplianceScore),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build the conversation this scenario dispatches.
    pub fn conversation(&self) -> Conversation {
        match &self.input {
            ScenarioInput::Text {
                text,
                customer_name,
                agent_name,
            } => Conversation::new(
                vec![Message::customer(text.clone())],
                customer_name.as_deref().unwrap_or(PLACEHOLDER_CUSTOMER),
                agent_name.as_deref().unwrap_or(PLACEHOLDER_AGENT),
            ),
            ScenarioInput::Conversation { conversation } => conversation.clone(),
        }
    }

    /// The utterance of a text scenario, or the first customer message otherwise.
    pub fn preview_text(&self) -> &str {
        match &self.input {
            ScenarioInput::Text { text, .. } => text,
            ScenarioInput::Conversation { conversation } => conversation
                .messages
                .iter()
                .find(|m| m.sender == super::conversation::Sender::Customer)
                .or_else(|| conversation.messages.first())
                .map(|m| m.text.as_str())
                .unwrap_or(""),
        }
    }

    pub fn expected_emotion(&self) -> Option<Emotion> {
        match self.expected {
            Some(Expectation::Emotion(e)) => Some(e),
            _ => None,
        }
    }

    pub fn score_predicate(&self) -> Option<ScorePredicate> {
        match self.expected {
            Some(Expectation::ComplianceScore(p)) => Some(p),
            _ => None,
        }
    }
}
