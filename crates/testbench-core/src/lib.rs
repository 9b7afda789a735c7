//! Analyzer Testbench Core Library
//!
//! Drives a remote emotion/compliance analysis service with predefined
//! scenarios and ad-hoc text, records every run, and aggregates accuracy
//! and confidence statistics.

pub mod aggregate;
pub mod catalog;
pub mod client;
pub mod config;
pub mod domain;
pub mod executor;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod telemetry;
pub mod validation;

pub use aggregate::{summarize, summarize_compliance};

pub use catalog::{builtin_compliance, ScenarioCatalog};

pub use client::{
    AnalysisClient, BatchKind, ClientError, ClientResult, HealthProbe, HealthReport,
    HttpAnalyzerClient, RemoteBatchEntry, ScenarioSource,
};

pub use config::TestbenchConfig;

pub use domain::{
    AnalysisResult, BatchRun, BatchSummary, CategoryAccuracy, ComplianceAnalysis,
    ComplianceBatchSummary, ComplianceSummary, Conversation, Emotion, EmotionAnalysis,
    ErrorEnvelope, ErrorKind, Expectation, Message, MessageEmotion, Result, RunKind, RunOutcome,
    RunRecord, Scenario, ScenarioCategory, ScenarioInput, ScoreOp, ScorePredicate, Sender,
    TestbenchError, ValidationMetrics,
};

pub use executor::{Dispatch, ExecutorState, Panels, RunExecutor};

pub use telemetry::init_tracing;

pub use reporting::{
    render_batch_summary_md, write_batch_report_json, write_batch_summary_md,
    BatchReportArtifact,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
