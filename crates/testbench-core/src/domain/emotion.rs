//! Emotion labels produced by the classifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six emotion classes the analyzer can return.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Love,
    Surprise,
    Anger,
    Fear,
    Sadness,
}

impl Emotion {
    /// Breakdown order used for per-category reporting.
    pub const ALL: [Emotion; 6] = [
        Emotion::Joy,
        Emotion::Anger,
        Emotion::Sadness,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Love,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Love => "love",
            Emotion::Surprise => "surprise",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Sadness => "sadness",
        }
    }

    /// Whether the analyzer treats this emotion as negative when scoring agent responses.
    pub fn is_negative(&self) -> bool {
        matches!(self, Emotion::Anger | Emotion::Fear | Emotion::Sadness)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a label is not one of the six known emotions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joy" => Ok(Emotion::Joy),
            "love" => Ok(Emotion::Love),
            "surprise" => Ok(Emotion::Surprise),
            "anger" => Ok(Emotion::Anger),
            "fear" => Ok(Emotion::Fear),
            "sadness" => Ok(Emotion::Sadness),
            _ => Err(UnknownEmotion(s.to_string())),
        }
    }
}
