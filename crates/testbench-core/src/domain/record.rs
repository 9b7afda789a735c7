//! Run records: the outcome of dispatching one input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::AnalysisResult;
use super::emotion::Emotion;
use super::error::ErrorEnvelope;
use super::scenario::Scenario;

/// Which entry point produced a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Ad-hoc text typed by the operator.
    Quick,
    /// A single catalog scenario (emotion or compliance).
    Scenario,
    /// One item of a locally orchestrated batch.
    Batch,
    /// One entry of a server-side batch.
    RemoteBatch,
}

/// Either the parsed analyzer result or the failure that replaced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { result: AnalysisResult },
    Errored { error: ErrorEnvelope },
}

impl From<Result<AnalysisResult, ErrorEnvelope>> for RunOutcome {
    fn from(r: Result<AnalysisResult, ErrorEnvelope>) -> Self {
        match r {
            Ok(result) => RunOutcome::Completed { result },
            Err(error) => RunOutcome::Errored { error },
        }
    }
}

/// The outcome of one dispatched test, paired with correctness information.
///
/// Records are built once by [`RunRecord::new`] (or
/// [`RunRecord::new_with_fallback`]) and never mutated afterwards; the derived
/// fields are computed from the scenario expectation and the outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub kind: RunKind,
    pub scenario: Option<Scenario>,
    pub outcome: RunOutcome,
    /// Top emotion matched the expected label. Only set for emotion results
    /// of scenarios with an emotion expectation.
    pub correct: Option<bool>,
    /// Compliance score satisfied the scenario's predicate. Only set for
    /// compliance results of scenarios with a score expectation.
    pub expectation_met: Option<bool>,
    /// Confidence of the top message, for emotion results.
    pub confidence: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunRecord {
    pub fn new(
        kind: RunKind,
        scenario: Option<Scenario>,
        outcome: RunOutcome,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self::new_with_fallback(kind, scenario, outcome, started_at, duration_ms, None)
    }

    /// Like [`RunRecord::new`], with a correctness verdict reported by the
    /// analyzer itself.
    ///
    /// `fallback_correct` is used only for emotion results whose scenario has
    /// no emotion expectation to check against.
    pub fn new_with_fallback(
        kind: RunKind,
        scenario: Option<Scenario>,
        outcome: RunOutcome,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        fallback_correct: Option<bool>,
    ) -> Self {
        let mut correct = None;
        let mut expectation_met = None;
        let mut confidence = None;

        if let RunOutcome::Completed { result } = &outcome {
            match result {
                AnalysisResult::Emotion(analysis) => {
                    let top = analysis.top_message();
                    confidence = top.map(|m| m.confidence);
                    correct = match scenario.as_ref().and_then(|s| s.expected_emotion()) {
                        Some(expected) => Some(top.map(|m| m.emotion) == Some(expected)),
                        None => fallback_correct.filter(|_| top.is_some()),
                    };
                }
                AnalysisResult::Compliance(analysis) => {
                    if let Some(predicate) = scenario.as_ref().and_then(|s| s.score_predicate()) {
                        expectation_met = Some(predicate.matches(analysis.overall_score));
                    }
                }
            }
        }

        Self {
            run_id: Uuid::new_v4(),
            kind,
            scenario,
            outcome,
            correct,
            expectation_met,
            confidence,
            started_at,
            duration_ms,
        }
    }

    /// Replace the generated run id, e.g. with one already used for logging.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, RunOutcome::Errored { .. })
    }

    pub fn is_correct(&self) -> bool {
        self.correct == Some(true)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.outcome {
            RunOutcome::Completed { result } => Some(result),
            RunOutcome::Errored { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorEnvelope> {
        match &self.outcome {
            RunOutcome::Errored { error } => Some(error),
            RunOutcome::Completed { .. } => None,
        }
    }

    pub fn expected_emotion(&self) -> Option<Emotion> {
        self.scenario.as_ref().and_then(|s| s.expected_emotion())
    }

    pub fn top_emotion(&self) -> Option<Emotion> {
        self.result()
            .and_then(|r| r.as_emotion())
            .and_then(|e| e.top_emotion())
    }

    pub fn compliance_score(&self) -> Option<f64> {
        self.result()
            .and_then(|r| r.as_compliance())
            .map(|c| c.overall_score)
    }

    /// Display label: scenario name, or the run id for ad-hoc input.
    pub fn label(&self) -> String {
        self.scenario
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| self.run_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{
        ComplianceAnalysis, ComplianceSummary, EmotionAnalysis, MessageEmotion,
    };
    use crate::domain::conversation::{Conversation, Sender};
    use crate::domain::scenario::{ScoreOp, ScorePredicate};

    fn emotion_result(emotion: Emotion, confidence: f64) -> AnalysisResult {
        AnalysisResult::Emotion(EmotionAnalysis {
            messages: vec![MessageEmotion {
                sender: Sender::Customer,
                text: "I'm terrified my account was hacked".to_string(),
                emotion,
                confidence,
            }],
        })
    }

    #[test]
    fn test_correct_when_top_emotion_matches() {
        let scenario = Scenario::emotion(
            "fear-1",
            "Hacked account",
            "I'm terrified my account was hacked",
            Some(Emotion::Fear),
        );
        let record = RunRecord::new(
            RunKind::Scenario,
            Some(scenario),
            RunOutcome::Completed {
                result: emotion_result(Emotion::Fear, 0.93),
            },
            Utc::now(),
            12,
        );
        assert_eq!(record.correct, Some(true));
        assert_eq!(record.confidence, Some(0.93));
        assert!(record.expectation_met.is_none());
    }

    #[test]
    fn test_incorrect_when_top_emotion_differs() {
        let scenario = Scenario::emotion("fear-1", "Hacked", "...", Some(Emotion::Fear));
        let record = RunRecord::new(
            RunKind::Scenario,
            Some(scenario),
            RunOutcome::Completed {
                result: emotion_result(Emotion::Surprise, 0.51),
            },
            Utc::now(),
            12,
        );
        assert_eq!(record.correct, Some(false));
        assert!(!record.is_correct());
    }

    #[test]
    fn test_quick_run_has_no_correctness() {
        let record = RunRecord::new(
            RunKind::Quick,
            None,
            RunOutcome::Completed {
                result: emotion_result(Emotion::Joy, 0.8),
            },
            Utc::now(),
            5,
        );
        assert!(record.correct.is_none());
        assert_eq!(record.confidence, Some(0.8));
    }

    #[test]
    fn test_fallback_verdict_only_without_expectation() {
        let unlabelled = Scenario::emotion("e-0", "Unlabelled", "Best day ever", None);
        let record = RunRecord::new_with_fallback(
            RunKind::RemoteBatch,
            Some(unlabelled),
            RunOutcome::Completed {
                result: emotion_result(Emotion::Joy, 0.9),
            },
            Utc::now(),
            0,
            Some(true),
        );
        assert_eq!(record.correct, Some(true));

        let labelled = Scenario::emotion("e-1", "Labelled", "Best day ever", Some(Emotion::Fear));
        let record = RunRecord::new_with_fallback(
            RunKind::RemoteBatch,
            Some(labelled),
            RunOutcome::Completed {
                result: emotion_result(Emotion::Joy, 0.9),
            },
            Utc::now(),
            0,
            Some(true),
        );
        assert_eq!(record.correct, Some(false));
    }

    #[test]
    fn test_errored_record_has_no_derived_fields() {
        let scenario = Scenario::emotion("fear-1", "Hacked", "...", Some(Emotion::Fear));
        let record = RunRecord::new(
            RunKind::Batch,
            Some(scenario),
            RunOutcome::Errored {
                error: ErrorEnvelope::failure("Network error"),
            },
            Utc::now(),
            3,
        );
        assert!(record.is_error());
        assert!(record.correct.is_none());
        assert!(record.confidence.is_none());
        assert_eq!(record.expected_emotion(), Some(Emotion::Fear));
    }

    #[test]
    fn test_compliance_expectation_met() {
        let scenario = Scenario::compliance(
            "c1",
            "Poor Compliance",
            Conversation::single_customer("This is ridiculous!"),
            Some(ScorePredicate::new(ScoreOp::Lt, 30.0)),
        );
        let record = RunRecord::new(
            RunKind::Scenario,
            Some(scenario),
            RunOutcome::Completed {
                result: AnalysisResult::Compliance(ComplianceAnalysis {
                    summary: ComplianceSummary::default(),
                    overall_score: 12.0,
                }),
            },
            Utc::now(),
            40,
        );
        assert_eq!(record.expectation_met, Some(true));
        assert_eq!(record.compliance_score(), Some(12.0));
        assert!(record.correct.is_none());
    }
}
