//! Aggregated statistics over a set of run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::emotion::Emotion;
use super::error::ErrorEnvelope;
use super::record::RunRecord;

/// Accuracy for one expected emotion label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryAccuracy {
    pub correct: usize,
    pub total: usize,
    /// Rounded percentage; `0` when `total == 0`.
    pub accuracy_pct: u32,
}

/// Emotion accuracy/confidence statistics for a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    /// Every record, errored ones included.
    pub total: usize,
    pub correct_count: usize,
    pub errored_count: usize,
    pub accuracy_pct: u32,
    pub avg_confidence_pct: u32,
    /// Always holds all six labels.
    pub per_category: BTreeMap<Emotion, CategoryAccuracy>,
}

impl BatchSummary {
    /// Records that produced a result.
    pub fn succeeded_count(&self) -> usize {
        self.total - self.errored_count
    }
}

/// Score statistics for compliance-shaped records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceBatchSummary {
    pub total: usize,
    pub errored_count: usize,
    /// Records with a compliance result.
    pub scored: usize,
    /// Scored records whose score satisfied their scenario predicate.
    pub expectations_met: usize,
    /// Scored records whose scenario carried a predicate.
    pub expectations_checked: usize,
    /// Mean overall score, rounded to one decimal; `0.0` when nothing scored.
    pub avg_score: f64,
    /// Rule name to rounded pass percentage across scored records.
    pub rule_pass_pct: BTreeMap<String, u32>,
}

/// A completed batch: every record resolved, summaries computed once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchRun {
    pub batch_id: Uuid,
    pub records: Vec<RunRecord>,
    pub summary: BatchSummary,
    pub compliance: ComplianceBatchSummary,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Set when the batch as a whole failed before producing records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl BatchRun {
    pub fn errored(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.iter().filter(|r| r.is_error())
    }
}
