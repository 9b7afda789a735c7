//! Observability tests for run lifecycle tracing and counters.

use std::sync::Arc;

use testbench_core::fakes::ScriptedAnalyzer;
use testbench_core::metrics::METRICS;
use testbench_core::obs::{
    batch_span, emit_batch_summarized, emit_catalog_degraded, emit_run_finished,
    emit_run_rejected, emit_run_started, emit_validation_unavailable, run_span,
};
use testbench_core::{summarize, Emotion, RunExecutor, RunKind};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_run_lifecycle() {
    let _span = run_span("run-123", RunKind::Scenario).entered();
    emit_run_started("run-123", RunKind::Scenario, "Hacked account");
    emit_run_finished("run-123", 420, true, Some(true));
}

#[traced_test]
#[test]
fn test_emit_warnings() {
    emit_run_rejected("batch");
    emit_validation_unavailable(&"HTTP 404: Resource not found");
    emit_catalog_degraded("emotion", &"network error");
}

#[traced_test]
#[test]
fn test_emit_batch_summarized() {
    let _span = batch_span("batch-1", 0).entered();
    emit_batch_summarized("batch-1", &summarize(&[]), 0);
}

#[traced_test]
#[tokio::test]
async fn test_dispatch_counters_move() {
    let fake = Arc::new(ScriptedAnalyzer::new().with_emotion("ok", Emotion::Joy, 0.9));
    let executor = RunExecutor::from_client(fake);

    let before_dispatched = METRICS.runs_dispatched();
    let before_failures = METRICS.analysis_failures();
    executor.run_single("ok").await.expect("run");
    executor.run_single("unscripted").await.expect("run");

    // Counters are process-wide; other tests may add to them concurrently.
    assert!(METRICS.runs_dispatched() >= before_dispatched + 2);
    assert!(METRICS.analysis_failures() > before_failures);
    METRICS.flush();
}
