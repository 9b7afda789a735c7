use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

use crate::domain::{BatchRun, BatchSummary, ComplianceBatchSummary, Emotion, ErrorEnvelope};

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// One dispatched scenario in the persisted batch report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchItemArtifact {
    pub run_id: Uuid,
    pub scenario_id: Option<String>,
    pub name: String,
    pub expected: Option<String>,
    pub detected: Option<Emotion>,
    pub compliance_score: Option<f64>,
    pub confidence: Option<f64>,
    pub correct: Option<bool>,
    pub expectation_met: Option<bool>,
    pub error: Option<ErrorEnvelope>,
    pub duration_ms: u64,
}

/// Batch report artifact written by `testbench batch --output`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub batch_id: Uuid,
    /// sha256 over the ordered scenario ids; equal digests mean the same scenario set.
    pub scenario_set_digest: String,
    pub summary: BatchSummary,
    pub compliance: ComplianceBatchSummary,
    pub items: Vec<BatchItemArtifact>,
}

/// Digest of an ordered list of scenario ids.
pub fn scenario_set_digest<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

impl BatchReportArtifact {
    pub fn from_batch(batch: &BatchRun) -> Self {
        let items: Vec<BatchItemArtifact> = batch
            .records
            .iter()
            .map(|r| BatchItemArtifact {
                run_id: r.run_id,
                scenario_id: r.scenario.as_ref().map(|s| s.id.clone()),
                name: r.label(),
                expected: r
                    .scenario
                    .as_ref()
                    .and_then(|s| s.expected.as_ref())
                    .map(|e| e.to_string()),
                detected: r.top_emotion(),
                compliance_score: r.compliance_score(),
                confidence: r.confidence,
                correct: r.correct,
                expectation_met: r.expectation_met,
                error: r.error().cloned(),
                duration_ms: r.duration_ms,
            })
            .collect();

        let digest = scenario_set_digest(items.iter().filter_map(|i| i.scenario_id.as_deref()));

        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            batch_id: batch.batch_id,
            scenario_set_digest: digest,
            summary: batch.summary.clone(),
            compliance: batch.compliance.clone(),
            items,
        }
    }

    /// Whether any item was checked against, or answered with, an emotion.
    pub fn has_emotion_runs(&self) -> bool {
        self.summary.per_category.values().any(|c| c.total > 0)
            || self.items.iter().any(|i| i.detected.is_some())
    }
}

/// Write the batch report in pretty JSON format.
pub fn write_batch_report_json(path: &Path, artifact: &BatchReportArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize batch report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render the Markdown summary printed after a batch.
pub fn render_batch_summary_md(artifact: &BatchReportArtifact) -> String {
    let s = &artifact.summary;
    let mut out = String::new();
    out.push_str("# Batch Summary\n\n");
    out.push_str(&format!("- total: {}\n- errored: {}\n", s.total, s.errored_count));

    if artifact.has_emotion_runs() {
        out.push_str(&format!(
            "- correct: {}/{}\n- accuracy: {}%\n- avg confidence: {}%\n",
            s.correct_count, s.total, s.accuracy_pct, s.avg_confidence_pct
        ));
        out.push_str("\n## Per Emotion\n");
        for emotion in Emotion::ALL {
            if let Some(c) = s.per_category.get(&emotion) {
                out.push_str(&format!(
                    "- {}: {}% ({}/{})\n",
                    emotion, c.accuracy_pct, c.correct, c.total
                ));
            }
        }
    }

    let c = &artifact.compliance;
    if c.scored > 0 {
        out.push_str("\n## Compliance\n");
        out.push_str(&format!(
            "- scored: {}\n- avg score: {:.1}\n- expectations met: {}/{}\n",
            c.scored, c.avg_score, c.expectations_met, c.expectations_checked
        ));
        for (rule, pct) in &c.rule_pass_pct {
            out.push_str(&format!("- rule `{}`: {}% pass\n", rule, pct));
        }
    }

    let failed: Vec<_> = artifact.items.iter().filter(|i| i.error.is_some()).collect();
    if !failed.is_empty() {
        out.push_str("\n## Errors\n");
        for item in failed {
            if let Some(err) = &item.error {
                out.push_str(&format!("- {}: {}\n", item.name, err.message));
            }
        }
    }
    out
}

/// Write the Markdown summary.
pub fn write_batch_summary_md(path: &Path, artifact: &BatchReportArtifact) -> Result<()> {
    let md = render_batch_summary_md(artifact);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
