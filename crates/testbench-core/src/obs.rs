//! Structured lifecycle events for test runs.
//!
//! Every event carries an `event` field so JSON logs can be filtered on it:
//! `run.started`, `run.finished`, `run.rejected`, `batch.summarized`,
//! `validation.unavailable`, `catalog.degraded`.

use tracing::{info, warn};

use crate::domain::{BatchSummary, RunKind};

/// Span tying every log line of one dispatch to its run id.
///
/// Attach with [`tracing::Instrument::instrument`]; dispatches suspend, so
/// the span must not be entered across an await.
pub fn run_span(run_id: &str, kind: RunKind) -> tracing::Span {
    tracing::info_span!("testbench.run", run_id = %run_id, kind = ?kind)
}

/// Span covering one batch, parent of its runs' spans.
pub fn batch_span(batch_id: &str, size: usize) -> tracing::Span {
    tracing::info_span!("testbench.batch", batch_id = %batch_id, size = size)
}

/// Span covering one server-side batch. `size` is empty until the server
/// has answered; fill it with [`tracing::Span::record`].
pub fn remote_batch_span(batch_id: &str, kind: &str) -> tracing::Span {
    tracing::info_span!(
        "testbench.batch",
        batch_id = %batch_id,
        kind = %kind,
        size = tracing::field::Empty,
    )
}

pub fn emit_run_started(run_id: &str, kind: RunKind, label: &str) {
    info!(event = "run.started", run_id = %run_id, kind = ?kind, label = %label);
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, success: bool, correct: Option<bool>) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = success,
        correct = ?correct,
    );
}

/// A second run was attempted while one was in flight.
pub fn emit_run_rejected(entry_point: &str) {
    warn!(event = "run.rejected", entry_point = %entry_point, "a run is already in progress");
}

pub fn emit_batch_summarized(batch_id: &str, summary: &BatchSummary, duration_ms: u64) {
    info!(
        event = "batch.summarized",
        batch_id = %batch_id,
        total = summary.total,
        correct = summary.correct_count,
        errored = summary.errored_count,
        accuracy_pct = summary.accuracy_pct,
        avg_confidence_pct = summary.avg_confidence_pct,
        duration_ms = duration_ms,
    );
}

pub fn emit_validation_unavailable(error: &dyn std::fmt::Display) {
    warn!(event = "validation.unavailable", error = %error);
}

/// Remote scenarios could not be loaded; the built-in set is used alone.
pub fn emit_catalog_degraded(category: &str, error: &dyn std::fmt::Display) {
    warn!(event = "catalog.degraded", category = %category, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_create() {
        let _run = run_span("test-run-id", RunKind::Quick).entered();
        let _batch = batch_span("test-batch-id", 3);
    }
}
