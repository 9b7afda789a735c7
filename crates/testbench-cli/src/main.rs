//! Analyzer Testbench CLI
//!
//! The `testbench` command drives a remote emotion/compliance analyzer.
//!
//! ## Commands
//!
//! - `scenarios`: List the scenario catalog
//! - `quick`: Analyze ad-hoc text
//! - `scenario`: Run one catalog scenario against its expectation
//! - `compliance`: Run a built-in compliance conversation
//! - `batch`: Run a whole category and print accuracy statistics
//! - `validate`: Fetch system-health metrics

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use testbench_core::client::ScenarioSource;
use testbench_core::metrics::METRICS;
use testbench_core::{
    render_batch_summary_md, write_batch_report_json, AnalysisResult, BatchKind,
    BatchReportArtifact, BatchRun, Dispatch, HttpAnalyzerClient, RunExecutor, RunRecord,
    ScenarioCatalog, ScenarioCategory, TestbenchConfig, TestbenchError, ValidationMetrics,
};

#[derive(Parser)]
#[command(name = "testbench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Test console for the emotion and compliance analyzer", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Analyzer API base URL
    #[arg(long, global = true, env = "ANALYZER_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, env = "ANALYZER_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenarios from the remote catalog plus the built-in compliance set
    Scenarios {
        /// Only list one category (emotion or compliance)
        #[arg(short, long)]
        category: Option<ScenarioCategory>,
    },

    /// Analyze a piece of text as a single customer message
    Quick {
        /// Text to analyze
        text: String,

        /// Print the run record as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Run one scenario by id or name
    Scenario {
        /// Scenario id or (case-insensitive) name
        key: String,

        /// Print the run record as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Run a built-in compliance conversation by index or name
    Compliance {
        /// Zero-based index or name, e.g. "0" or "Poor Compliance"
        key: String,

        /// Print the run record as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Run every scenario of a category and summarize
    Batch {
        /// Category to run (emotion or compliance)
        #[arg(short, long, default_value = "emotion")]
        category: ScenarioCategory,

        /// Concurrent dispatches (1 = sequential)
        #[arg(long, env = "TESTBENCH_BATCH_CONCURRENCY")]
        concurrency: Option<usize>,

        /// Only run the quick-test subset (first six emotion scenarios)
        #[arg(long, conflicts_with = "remote")]
        quick: bool,

        /// Let the server run the batch instead of dispatching locally
        #[arg(long)]
        remote: bool,

        /// Write the batch report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch system-health metrics from the validation endpoint
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    testbench_core::init_tracing(cli.json, level);

    let mut config = TestbenchConfig::from_env();
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout_ms(ms);
    }
    info!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "analyzer configured");

    let client = Arc::new(
        HttpAnalyzerClient::new(config.clone()).context("Failed to create analyzer client")?,
    );
    let executor = RunExecutor::from_client(client.clone()).with_config(&config);

    let result = match cli.command {
        Commands::Scenarios { category } => cmd_scenarios(client.as_ref(), category).await,
        Commands::Quick { text, raw } => cmd_quick(&executor, &text, raw).await,
        Commands::Scenario { key, raw } => {
            cmd_scenario(client.as_ref(), &executor, &key, raw).await
        }
        Commands::Compliance { key, raw } => cmd_compliance(&executor, &key, raw).await,
        Commands::Batch {
            category,
            concurrency,
            quick,
            remote,
            output,
        } => {
            let executor = match concurrency {
                Some(n) => executor.with_batch_concurrency(n),
                None => executor,
            };
            cmd_batch(
                client.as_ref(),
                &executor,
                category,
                quick,
                remote,
                output.as_deref(),
            )
            .await
        }
        Commands::Validate => cmd_validate(&executor).await,
    };

    METRICS.flush();
    result
}

fn admitted<T>(dispatch: Dispatch<T>) -> Result<T> {
    match dispatch {
        Dispatch::Completed(v) => Ok(v),
        Dispatch::Busy => bail!("A test is already running"),
    }
}

/// List the scenario catalog
async fn cmd_scenarios(
    source: &dyn ScenarioSource,
    category: Option<ScenarioCategory>,
) -> Result<()> {
    let catalog = ScenarioCatalog::load(source).await;

    let categories = match category {
        Some(c) => vec![c],
        None => vec![ScenarioCategory::Emotion, ScenarioCategory::Compliance],
    };

    for category in categories {
        let scenarios = catalog.category(category);
        println!("{} scenarios ({})", category, scenarios.len());
        for s in &scenarios {
            let expected = s
                .expected
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<28} {:<32} expected: {}", s.id, s.name, expected);
        }
        println!();
    }

    Ok(())
}

/// Analyze ad-hoc text
async fn cmd_quick(executor: &RunExecutor, text: &str, raw: bool) -> Result<()> {
    let record = match executor.run_single(text).await {
        Ok(dispatch) => admitted(dispatch)?,
        Err(TestbenchError::EmptyInput) => bail!("Please enter some text to analyze"),
        Err(e) => return Err(e.into()),
    };
    print_record(&record, raw)
}

/// Run one catalog scenario
async fn cmd_scenario(
    source: &dyn ScenarioSource,
    executor: &RunExecutor,
    key: &str,
    raw: bool,
) -> Result<()> {
    let catalog = ScenarioCatalog::load(source).await;
    let scenario = catalog
        .find(key)
        .with_context(|| format!("No scenario matches '{}'", key))?;

    let record = admitted(executor.run_scenario(&scenario).await)?;
    print_record(&record, raw)
}

/// Run a built-in compliance conversation
async fn cmd_compliance(executor: &RunExecutor, key: &str, raw: bool) -> Result<()> {
    let record = admitted(executor.run_compliance(key).await?)?;
    print_record(&record, raw)
}

/// Run a category as a batch and print its summary
async fn cmd_batch(
    source: &dyn ScenarioSource,
    executor: &RunExecutor,
    category: ScenarioCategory,
    quick: bool,
    remote: bool,
    output: Option<&Path>,
) -> Result<()> {
    let batch: BatchRun = if remote {
        admitted(executor.run_remote_batch(BatchKind::from(category)).await)?
    } else {
        let catalog = ScenarioCatalog::load(source).await;
        let scenarios = if quick {
            catalog.quick_scenarios().to_vec()
        } else {
            catalog.category(category)
        };
        if scenarios.is_empty() {
            bail!("No {} scenarios available", category);
        }
        println!("Running {} {} scenarios...", scenarios.len(), category);
        admitted(executor.run_batch(&scenarios).await)?
    };

    if let Some(err) = &batch.error {
        println!("Batch failed: {}", err.message);
    }

    let artifact = BatchReportArtifact::from_batch(&batch);
    println!("{}", render_batch_summary_md(&artifact));

    if let Some(path) = output {
        write_batch_report_json(path, &artifact)?;
        println!("Report written to {:?}", path);
    }

    Ok(())
}

/// Fetch system-health metrics
async fn cmd_validate(executor: &RunExecutor) -> Result<()> {
    match admitted(executor.run_validation().await)? {
        ValidationMetrics::Available {
            emotion_accuracy_pct,
            compliance_accuracy_pct,
            avg_response_time_ms,
        } => {
            println!("Emotion accuracy:      {:.1}%", emotion_accuracy_pct);
            println!("Compliance accuracy:   {:.1}%", compliance_accuracy_pct);
            println!("Average response time: {:.0} ms", avg_response_time_ms);
        }
        ValidationMetrics::Unavailable { reason } => {
            println!("{}", reason);
        }
    }
    Ok(())
}

fn print_record(record: &RunRecord, raw: bool) -> Result<()> {
    if raw {
        let json = serde_json::to_string_pretty(record).context("serialize run record")?;
        println!("{}", json);
        return Ok(());
    }

    println!("{} ({} ms)", record.label(), record.duration_ms);

    match record.result() {
        Some(AnalysisResult::Emotion(analysis)) => {
            for m in &analysis.messages {
                println!(
                    "  [{}] {:<8} {:>3.0}%  {}",
                    m.sender.as_str(),
                    m.emotion.as_str(),
                    m.confidence * 100.0,
                    m.text
                );
            }
            if let Some(top) = analysis.top_message() {
                println!("Detected: {} ({:.0}%)", top.emotion, top.confidence * 100.0);
            }
            if let (Some(expected), Some(correct)) = (record.expected_emotion(), record.correct) {
                let verdict = if correct { "correct" } else { "incorrect" };
                println!("Expected: {} ({})", expected, verdict);
            }
        }
        Some(AnalysisResult::Compliance(analysis)) => {
            println!("Overall compliance score: {:.1}", analysis.overall_score);
            for (rule, passed) in &analysis.summary.rules {
                println!("  [{}] {}", if *passed { "pass" } else { "fail" }, rule);
            }
            if !analysis.summary.customer_emotions.is_empty() {
                let emotions: Vec<_> = analysis
                    .summary
                    .customer_emotions
                    .iter()
                    .map(|e| e.as_str())
                    .collect();
                println!("Customer emotions: {}", emotions.join(", "));
            }
            if analysis.summary.negative_emotions_detected {
                println!("Negative emotions detected");
            }
            if let (Some(predicate), Some(met)) = (
                record.scenario.as_ref().and_then(|s| s.score_predicate()),
                record.expectation_met,
            ) {
                let verdict = if met { "met" } else { "not met" };
                println!("Expected score {}: {}", predicate, verdict);
            }
        }
        None => {
            if let Some(err) = record.error() {
                println!("Error: {}", err.message);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use testbench_core::fakes::{compliance_result, ScriptedAnalyzer};
    use testbench_core::{Emotion, Scenario};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_batch_args_parse() {
        let cli = Cli::try_parse_from([
            "testbench",
            "batch",
            "--category",
            "compliance",
            "--concurrency",
            "3",
            "--output",
            "report.json",
        ])
        .expect("parse");
        match cli.command {
            Commands::Batch {
                category,
                concurrency,
                output,
                ..
            } => {
                assert_eq!(category, ScenarioCategory::Compliance);
                assert_eq!(concurrency, Some(3));
                assert_eq!(output, Some(PathBuf::from("report.json")));
            }
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_quick_and_remote_conflict() {
        assert!(Cli::try_parse_from(["testbench", "batch", "--quick", "--remote"]).is_err());
    }

    #[tokio::test]
    async fn test_quick_rejects_blank_text() {
        let fake = Arc::new(ScriptedAnalyzer::new());
        let executor = RunExecutor::from_client(fake.clone());
        let err = cmd_quick(&executor, "   ", false).await.expect_err("blank");
        assert!(err.to_string().contains("enter some text"));
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_writes_report() {
        let fake = Arc::new(
            ScriptedAnalyzer::new()
                .with_scenarios(
                    ScenarioCategory::Emotion,
                    Ok(vec![Scenario::emotion(
                        "joy-1",
                        "Delighted",
                        "Best day ever",
                        Some(Emotion::Joy),
                    )]),
                )
                .with_emotion("Best day ever", Emotion::Joy, 0.9),
        );
        let executor = RunExecutor::from_client(fake.clone());

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        cmd_batch(
            fake.as_ref(),
            &executor,
            ScenarioCategory::Emotion,
            false,
            false,
            Some(&path),
        )
        .await
        .expect("batch");

        let raw = std::fs::read_to_string(&path).expect("report exists");
        let report: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(report["summary"]["total"], 1);
        assert_eq!(report["summary"]["accuracy_pct"], 100);
    }

    #[tokio::test]
    async fn test_batch_without_scenarios_fails() {
        let fake = Arc::new(ScriptedAnalyzer::new());
        let executor = RunExecutor::from_client(fake.clone());
        let err = cmd_batch(
            fake.as_ref(),
            &executor,
            ScenarioCategory::Emotion,
            false,
            false,
            None,
        )
        .await
        .expect_err("no scenarios");
        assert!(err.to_string().contains("No emotion scenarios"));
    }

    #[tokio::test]
    async fn test_compliance_command_runs_builtin() {
        let fake = Arc::new(ScriptedAnalyzer::new().with_default(Ok(compliance_result(97.0))));
        let executor = RunExecutor::from_client(fake.clone());
        cmd_compliance(&executor, "0", false).await.expect("compliance");
        assert_eq!(fake.call_count(), 1);
        assert_eq!(fake.calls()[0].customer_name, "Mr. Johnson");
    }
}
