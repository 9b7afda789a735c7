use std::sync::Arc;

use testbench_core::fakes::{compliance_result, ScriptedAnalyzer};
use testbench_core::reporting::{scenario_set_digest, REPORT_SCHEMA_VERSION};
use testbench_core::{
    builtin_compliance, render_batch_summary_md, write_batch_report_json, write_batch_summary_md,
    BatchReportArtifact, BatchRun, Emotion, RunExecutor, Scenario,
};

async fn sample_batch() -> BatchRun {
    let scenarios = vec![
        Scenario::emotion("joy-1", "Delighted", "Best day ever", Some(Emotion::Joy)),
        Scenario::emotion(
            "fear-1",
            "Hacked",
            "I'm terrified my account was hacked",
            Some(Emotion::Fear),
        ),
    ];
    let fake =
        Arc::new(ScriptedAnalyzer::new().with_emotion("Best day ever", Emotion::Joy, 0.92));
    RunExecutor::from_client(fake)
        .run_batch(&scenarios)
        .await
        .completed()
        .expect("idle executor")
}

#[tokio::test]
async fn batch_report_schema_has_expected_keys() {
    let batch = sample_batch().await;
    let artifact = BatchReportArtifact::from_batch(&batch);

    let raw = serde_json::to_value(&artifact).expect("serialize artifact");
    let obj = raw.as_object().expect("artifact object");
    for key in [
        "schema_version",
        "generated_at",
        "batch_id",
        "scenario_set_digest",
        "summary",
        "compliance",
        "items",
    ] {
        assert!(obj.contains_key(key), "missing {key}");
    }
    assert_eq!(raw["schema_version"], REPORT_SCHEMA_VERSION);
    assert_eq!(raw["summary"]["total"], 2);
    assert_eq!(raw["items"][0]["detected"], "joy");
    assert_eq!(raw["items"][1]["error"]["kind"], "failure");
    assert_eq!(
        artifact.scenario_set_digest,
        scenario_set_digest(["joy-1", "fear-1"])
    );
}

#[tokio::test]
async fn write_batch_report_round_trips() {
    let batch = sample_batch().await;
    let artifact = BatchReportArtifact::from_batch(&batch);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("batch_report.json");
    write_batch_report_json(&path, &artifact).expect("write report");

    let raw = std::fs::read_to_string(&path).expect("read report");
    let loaded: BatchReportArtifact = serde_json::from_str(&raw).expect("parse report");
    assert_eq!(loaded, artifact);
}

#[tokio::test]
async fn markdown_summary_lists_errors_and_categories() {
    let batch = sample_batch().await;
    let artifact = BatchReportArtifact::from_batch(&batch);

    let md = render_batch_summary_md(&artifact);
    assert!(md.starts_with("# Batch Summary"));
    assert!(md.contains("- accuracy: 50%"));
    assert!(md.contains("- joy: 100% (1/1)"));
    assert!(md.contains("- fear: 0% (0/1)"));
    assert!(md.contains("## Errors"));
    assert!(md.contains("- Hacked: "));
    assert!(!md.contains("## Compliance"));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("summary.md");
    write_batch_summary_md(&path, &artifact).expect("write md");
    assert_eq!(std::fs::read_to_string(&path).expect("read md"), md);
}

#[tokio::test]
async fn compliance_batch_summary_omits_emotion_section() {
    let fake = Arc::new(ScriptedAnalyzer::new().with_default(Ok(compliance_result(95.0))));
    let batch = RunExecutor::from_client(fake)
        .run_batch(&builtin_compliance())
        .await
        .completed()
        .expect("idle executor");
    let artifact = BatchReportArtifact::from_batch(&batch);
    assert!(!artifact.has_emotion_runs());

    let md = render_batch_summary_md(&artifact);
    assert!(md.contains("- total: 3"));
    assert!(!md.contains("- accuracy:"));
    assert!(!md.contains("## Per Emotion"));
    assert!(md.contains("## Compliance"));
    assert!(md.contains("- expectations met: 2/3"));
}
