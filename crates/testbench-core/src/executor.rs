//! Run executor: dispatches single, scenario, batch and validation runs.
//!
//! The executor is a small state machine, `Idle -> Running -> Idle |
//! IdleWithResult`. At most one run is in flight; a request arriving while
//! another is running is answered with [`Dispatch::Busy`] without touching
//! the analyzer or the stored panels.
//!
//! Analyzer failures never escape as `Err`: they are converted into
//! [`ErrorEnvelope`]s on the record they affect. The only error an entry
//! point returns is a local precondition failure such as
//! [`TestbenchError::EmptyInput`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::aggregate;
use crate::catalog;
use crate::client::{AnalysisClient, BatchKind, HealthProbe, RemoteBatchEntry};
use crate::config::TestbenchConfig;
use crate::domain::{
    BatchRun, Conversation, ErrorEnvelope, Result, RunKind, RunOutcome, RunRecord, Scenario,
    ScenarioCategory, ScenarioInput, TestbenchError, ValidationMetrics,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::validation;

/// Outcome of an entry point call.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<T> {
    Completed(T),
    /// Another run was in flight; nothing was dispatched.
    Busy,
}

impl<T> Dispatch<T> {
    pub fn is_busy(&self) -> bool {
        matches!(self, Dispatch::Busy)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Dispatch::Completed(v) => Some(v),
            Dispatch::Busy => None,
        }
    }
}

/// Observable executor state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    Idle,
    Running,
    /// Idle, with at least one result panel populated.
    IdleWithResult,
}

/// The most recent result of each kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Panels {
    pub last_single: Option<RunRecord>,
    pub last_batch: Option<BatchRun>,
    pub last_validation: Option<ValidationMetrics>,
}

impl Panels {
    fn is_empty(&self) -> bool {
        self.last_single.is_none() && self.last_batch.is_none() && self.last_validation.is_none()
    }
}

/// Holds the busy flag for the lifetime of one run.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct RunExecutor {
    client: Arc<dyn AnalysisClient>,
    probe: Arc<dyn HealthProbe>,
    batch_concurrency: usize,
    busy: AtomicBool,
    panels: Mutex<Panels>,
}

impl RunExecutor {
    pub fn new(client: Arc<dyn AnalysisClient>, probe: Arc<dyn HealthProbe>) -> Self {
        Self {
            client,
            probe,
            batch_concurrency: 1,
            busy: AtomicBool::new(false),
            panels: Mutex::new(Panels::default()),
        }
    }

    /// Executor over one client that also serves the health probe.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: AnalysisClient + HealthProbe + 'static,
    {
        let probe: Arc<dyn HealthProbe> = client.clone();
        Self::new(client, probe)
    }

    pub fn with_config(self, config: &TestbenchConfig) -> Self {
        self.with_batch_concurrency(config.batch_concurrency)
    }

    /// Maximum dispatches in flight during [`Self::run_batch`]; clamped to at least 1.
    pub fn with_batch_concurrency(mut self, n: usize) -> Self {
        self.batch_concurrency = n.max(1);
        self
    }

    pub fn state(&self) -> ExecutorState {
        if self.busy.load(Ordering::Acquire) {
            ExecutorState::Running
        } else if self.panels().is_empty() {
            ExecutorState::Idle
        } else {
            ExecutorState::IdleWithResult
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Copy of the current result panels.
    pub fn snapshot(&self) -> Panels {
        self.panels().clone()
    }

    fn panels(&self) -> MutexGuard<'_, Panels> {
        self.panels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reject<T>(&self, entry_point: &str) -> Dispatch<T> {
        METRICS.inc_runs_rejected();
        obs::emit_run_rejected(entry_point);
        Dispatch::Busy
    }

    /// Analyze ad-hoc text as a one-message customer conversation.
    ///
    /// Blank text fails with [`TestbenchError::EmptyInput`] and the analyzer
    /// is not called.
    pub async fn run_single(&self, text: &str) -> Result<Dispatch<RunRecord>> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return Ok(self.reject("single"));
        };
        if text.trim().is_empty() {
            return Err(TestbenchError::EmptyInput);
        }

        let record = self
            .dispatch(RunKind::Quick, None, Conversation::single_customer(text))
            .await;
        self.panels().last_single = Some(record.clone());
        Ok(Dispatch::Completed(record))
    }

    /// Run one catalog scenario and check it against its expectation.
    pub async fn run_scenario(&self, scenario: &Scenario) -> Dispatch<RunRecord> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return self.reject("scenario");
        };

        let conversation = scenario.conversation();
        let record = self
            .dispatch(RunKind::Scenario, Some(scenario.clone()), conversation)
            .await;
        self.panels().last_single = Some(record.clone());
        Dispatch::Completed(record)
    }

    /// Run a built-in compliance conversation, by zero-based index or name.
    pub async fn run_compliance(&self, key: &str) -> Result<Dispatch<RunRecord>> {
        let scenario = catalog::find_builtin(key)
            .ok_or_else(|| TestbenchError::UnknownScenario(key.to_string()))?;
        Ok(self.run_scenario(&scenario).await)
    }

    /// Dispatch every scenario and summarize once all have resolved.
    ///
    /// Records keep input order regardless of concurrency. Failed items are
    /// recorded as errors and still counted in the summary total.
    pub async fn run_batch(&self, scenarios: &[Scenario]) -> Dispatch<BatchRun> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return self.reject("batch");
        };

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let concurrency = self.batch_concurrency;

        let records = stream::iter(scenarios.iter().cloned())
            .map(|scenario| {
                let conversation = scenario.conversation();
                self.dispatch(RunKind::Batch, Some(scenario), conversation)
            })
            .buffered(concurrency)
            .collect::<Vec<RunRecord>>()
            .instrument(obs::batch_span(&batch_id.to_string(), scenarios.len()))
            .await;

        let batch = self.finish_batch(batch_id, records, started_at, clock, None);
        Dispatch::Completed(batch)
    }

    /// Run a server-side batch and normalize its entries into records.
    ///
    /// A failed call yields a batch without records whose `error` is set.
    pub async fn run_remote_batch(&self, kind: BatchKind) -> Dispatch<BatchRun> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return self.reject("remote_batch");
        };

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let category = match kind {
            BatchKind::Emotions => ScenarioCategory::Emotion,
            BatchKind::Compliance => ScenarioCategory::Compliance,
        };

        METRICS.inc_runs_dispatched();
        let span = obs::remote_batch_span(&batch_id.to_string(), kind.as_str());
        let (records, error) = match self.client.batch(kind).instrument(span.clone()).await {
            Ok(entries) => {
                span.record("size", entries.len() as u64);
                let records = entries
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| {
                        normalize_remote_entry(index, entry, category, started_at)
                    })
                    .collect();
                (records, None)
            }
            Err(e) => {
                METRICS.inc_analysis_failures();
                let err = TestbenchError::from(e);
                warn!(batch_id = %batch_id, kind = %kind, error = %err, "remote batch failed");
                (Vec::new(), Some(ErrorEnvelope::from(&err)))
            }
        };

        let batch =
            span.in_scope(|| self.finish_batch(batch_id, records, started_at, clock, error));
        Dispatch::Completed(batch)
    }

    /// Query system-health metrics. Unavailability is a normal result.
    pub async fn run_validation(&self) -> Dispatch<ValidationMetrics> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return self.reject("validation");
        };

        let metrics = validation::validate(self.probe.as_ref()).await;
        self.panels().last_validation = Some(metrics.clone());
        Dispatch::Completed(metrics)
    }

    fn finish_batch(
        &self,
        batch_id: Uuid,
        records: Vec<RunRecord>,
        started_at: DateTime<Utc>,
        clock: Instant,
        error: Option<ErrorEnvelope>,
    ) -> BatchRun {
        let summary = aggregate::summarize(&records);
        let compliance = aggregate::summarize_compliance(&records);
        let duration_ms = clock.elapsed().as_millis() as u64;
        obs::emit_batch_summarized(&batch_id.to_string(), &summary, duration_ms);

        let batch = BatchRun {
            batch_id,
            records,
            summary,
            compliance,
            started_at,
            duration_ms,
            error,
        };
        self.panels().last_batch = Some(batch.clone());
        batch
    }

    /// Issue one analyzer call and fold its outcome into a record.
    async fn dispatch(
        &self,
        kind: RunKind,
        scenario: Option<Scenario>,
        conversation: Conversation,
    ) -> RunRecord {
        let run_id = Uuid::new_v4();
        let expected_shape = scenario
            .as_ref()
            .map(|s| s.category)
            .unwrap_or(ScenarioCategory::Emotion);
        let label = scenario
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "ad-hoc".to_string());

        async move {
            let run_id_str = run_id.to_string();
            obs::emit_run_started(&run_id_str, kind, &label);
            METRICS.inc_runs_dispatched();

            let started_at = Utc::now();
            let clock = Instant::now();
            let outcome = match self.client.analyze(&conversation, expected_shape).await {
                Ok(result) => RunOutcome::Completed { result },
                Err(e) => {
                    METRICS.inc_analysis_failures();
                    let err = TestbenchError::from(e);
                    warn!(error = %err, "analysis failed");
                    RunOutcome::Errored {
                        error: ErrorEnvelope::from(&err),
                    }
                }
            };
            let duration_ms = clock.elapsed().as_millis() as u64;

            let record = RunRecord::new(kind, scenario, outcome, started_at, duration_ms)
                .with_run_id(run_id);
            obs::emit_run_finished(&run_id_str, duration_ms, !record.is_error(), record.correct);
            record
        }
        .instrument(obs::run_span(&run_id.to_string(), kind))
        .await
    }
}

/// Turn one server-side batch entry into a record.
///
/// Correctness is recomputed from the entry's expectation and result; the
/// server's own `correct` flag is only used when no expectation could be
/// read.
pub fn normalize_remote_entry(
    index: usize,
    entry: RemoteBatchEntry,
    category: ScenarioCategory,
    started_at: DateTime<Utc>,
) -> RunRecord {
    let expected = entry.expectation(category);
    let outcome = match entry.analysis() {
        Ok(result) => RunOutcome::Completed { result },
        Err(e) => RunOutcome::Errored {
            error: ErrorEnvelope::from(&TestbenchError::from(e)),
        },
    };

    let name = if entry.name.is_empty() {
        format!("{category}-{index}")
    } else {
        entry.name.clone()
    };
    let scenario = Scenario {
        id: format!("{category}-{index}"),
        name,
        category,
        input: ScenarioInput::Text {
            text: entry.text.clone().unwrap_or_default(),
            customer_name: None,
            agent_name: None,
        },
        expected,
        metadata: serde_json::json!({ "source": "remote_batch" }),
    };

    RunRecord::new_with_fallback(
        RunKind::RemoteBatch,
        Some(scenario),
        outcome,
        started_at,
        0,
        entry.correct,
    )
}
