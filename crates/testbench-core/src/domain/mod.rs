//! Domain models for the testbench.
//!
//! Canonical definitions for the core entities:
//! - `Scenario`: a predefined input with its expected outcome
//! - `Conversation`: the request body sent to the analyzer
//! - `AnalysisResult`: emotion or compliance shaped analyzer output
//! - `RunRecord`: one dispatched test and its correctness
//! - `BatchSummary`: aggregated statistics over records
//! - `ValidationMetrics`: system-health metrics or their absence

pub mod analysis;
pub mod conversation;
pub mod emotion;
pub mod error;
pub mod record;
pub mod scenario;
pub mod summary;
pub mod validation;

// Re-export main types and errors
pub use analysis::{
    AnalysisResult, ComplianceAnalysis, ComplianceSummary, EmotionAnalysis, MessageEmotion,
};
pub use conversation::{Conversation, Message, Sender, PLACEHOLDER_AGENT, PLACEHOLDER_CUSTOMER};
pub use emotion::{Emotion, UnknownEmotion};
pub use error::{ErrorEnvelope, ErrorKind, PredicateParseError, Result, TestbenchError};
pub use record::{RunKind, RunOutcome, RunRecord};
pub use scenario::{
    Expectation, Scenario, ScenarioCategory, ScenarioInput, ScoreOp, ScorePredicate,
};
pub use summary::{BatchRun, BatchSummary, CategoryAccuracy, ComplianceBatchSummary};
pub use validation::ValidationMetrics;
