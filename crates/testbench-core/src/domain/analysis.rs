//! Analyzer results.
//!
//! The analyzer answers with one of two shapes depending on the request.
//! [`AnalysisResult`] fixes which one at parse time so consumers match on a
//! variant instead of probing for fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::conversation::Sender;
use super::emotion::Emotion;

/// Classification of a single message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEmotion {
    pub sender: Sender,
    pub text: String,
    pub emotion: Emotion,
    /// Classifier confidence in 0.0–1.0.
    pub confidence: f64,
}

/// Per-message emotion classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionAnalysis {
    pub messages: Vec<MessageEmotion>,
}

impl EmotionAnalysis {
    /// The message whose emotion stands for the whole result.
    ///
    /// Highest-confidence customer message; earliest wins on ties. Falls back
    /// to all messages when the conversation has no customer turn.
    pub fn top_message(&self) -> Option<&MessageEmotion> {
        let customers = self
            .messages
            .iter()
            .filter(|m| m.sender == Sender::Customer);
        pick_max(customers).or_else(|| pick_max(self.messages.iter()))
    }

    pub fn top_emotion(&self) -> Option<Emotion> {
        self.top_message().map(|m| m.emotion)
    }
}

fn pick_max<'a>(iter: impl Iterator<Item = &'a MessageEmotion>) -> Option<&'a MessageEmotion> {
    iter.fold(None, |best: Option<&MessageEmotion>, m| match best {
        Some(b) if b.confidence >= m.confidence => Some(b),
        _ => Some(m),
    })
}

/// Named policy checks plus the emotion context the analyzer derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplianceSummary {
    /// Rule name to pass/fail.
    pub rules: BTreeMap<String, bool>,
    pub customer_emotions: Vec<Emotion>,
    pub negative_emotions_detected: bool,
}

impl ComplianceSummary {
    pub fn passed_rules(&self) -> usize {
        self.rules.values().filter(|p| **p).count()
    }

    pub fn failed_rules(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(name, _)| name.as_str())
    }
}

/// Conversation compliance scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceAnalysis {
    pub summary: ComplianceSummary,
    /// Overall score in 0–100.
    pub overall_score: f64,
}

/// A parsed analyzer response. Exactly one shape per result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AnalysisResult {
    Emotion(EmotionAnalysis),
    Compliance(ComplianceAnalysis),
}

impl AnalysisResult {
    pub fn as_emotion(&self) -> Option<&EmotionAnalysis> {
        match self {
            AnalysisResult::Emotion(e) => Some(e),
            AnalysisResult::Compliance(_) => None,
        }
    }

    pub fn as_compliance(&self) -> Option<&ComplianceAnalysis> {
        match self {
            AnalysisResult::Compliance(c) => Some(c),
            AnalysisResult::Emotion(_) => None,
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            AnalysisResult::Emotion(_) => "emotion",
            AnalysisResult::Compliance(_) => "compliance",
        }
    }
}
