//! Process-wide counters for dispatch activity.
//!
//! Incremented at the call site; [`Metrics::flush`] emits all values as one
//! `info!` event, typically once per CLI command.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    runs_dispatched: AtomicU64,
    runs_rejected: AtomicU64,
    analysis_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_dispatched: AtomicU64::new(0),
            runs_rejected: AtomicU64::new(0),
            analysis_failures: AtomicU64::new(0),
        }
    }

    /// One analyzer call was issued.
    pub fn inc_runs_dispatched(&self) {
        self.runs_dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_dispatched", "counter incremented");
    }

    /// An entry point was refused because a run was in flight.
    pub fn inc_runs_rejected(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_rejected", "counter incremented");
    }

    /// An analyzer call ended in a timeout or failure.
    pub fn inc_analysis_failures(&self) {
        self.analysis_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "analysis_failures", "counter incremented");
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_dispatched = self.runs_dispatched(),
            runs_rejected = self.runs_rejected(),
            analysis_failures = self.analysis_failures(),
        );
    }

    pub fn runs_dispatched(&self) -> u64 {
        self.runs_dispatched.load(Ordering::Relaxed)
    }

    pub fn runs_rejected(&self) -> u64 {
        self.runs_rejected.load(Ordering::Relaxed)
    }

    pub fn analysis_failures(&self) -> u64 {
        self.analysis_failures.load(Ordering::Relaxed)
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.runs_dispatched.store(0, Ordering::Relaxed);
        self.runs_rejected.store(0, Ordering::Relaxed);
        self.analysis_failures.store(0, Ordering::Relaxed);
    }
}
