//! Batch Orchestrator: fan out the top N pending tasks, wait for every one,
//! then re-rank what is left.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use foreman_core::{scan, Registry, ScanOptions, ScanReport, TaskId, TaskStatus, Tier};
use foreman_scorer::{rank, ScoreOptions};

use crate::error::{join_err, ExecError};
use crate::executor::{Executor, RunOutcome};

/// Entries surfaced as `next_up` after the barrier.
pub const DEFAULT_NEXT_UP: usize = 5;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub size: usize,
    pub tier: Option<Tier>,
    pub dry_run: bool,
    pub dry_run_delay: Duration,
    pub focus_label: Option<String>,
    pub next_up: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            size: 3,
            tier: None,
            dry_run: false,
            dry_run_delay: Duration::from_millis(500),
            focus_label: None,
            next_up: DEFAULT_NEXT_UP,
        }
    }
}

/// Per-task result inside a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunResult {
    Finished {
        status: TaskStatus,
        exit_code: Option<i32>,
        cancelled: bool,
    },
    Simulated,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub task_id: TaskId,
    pub score: f64,
    pub result: RunResult,
    pub duration_ms: u64,
}

impl RunRecord {
    pub fn succeeded(&self) -> bool {
        match &self.result {
            RunResult::Finished { status, .. } => *status == TaskStatus::Completed,
            RunResult::Simulated => true,
            RunResult::Error { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NextUp {
    pub task_id: TaskId,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub dry_run: bool,
    pub runs: Vec<RunRecord>,
    pub next_up: Vec<NextUp>,
}

impl BatchReport {
    pub fn dispatched(&self) -> impl Iterator<Item = &TaskId> {
        self.runs.iter().map(|r| &r.task_id)
    }
}

pub struct BatchOrchestrator {
    executor: Executor,
    registry: Registry,
    backlog_file: PathBuf,
}

impl BatchOrchestrator {
    pub fn new(executor: Executor, registry: Registry, backlog_file: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            registry,
            backlog_file: backlog_file.into(),
        }
    }

    /// Run one batch. Per-task failures are recorded in the report; only a
    /// failed scan aborts the batch.
    pub async fn run(&self, options: &BatchOptions, cancel: CancellationToken) -> Result<BatchReport, ExecError> {
        let batch_id = Uuid::new_v4();
        let score_options = ScoreOptions {
            focus_label: options.focus_label.clone(),
            ..ScoreOptions::at(Utc::now())
        };

        let report = Arc::new(self.scan().await?);
        let selected = top_pending(&report, &score_options, options.size, &HashSet::new());
        tracing::info!(%batch_id, selected = selected.len(), dry_run = options.dry_run, "batch starting");

        let slots = selected.into_iter().map(|(task_id, score)| {
            let report = report.clone();
            let token = cancel.child_token();
            async move {
                let started = Instant::now();
                let result = if options.dry_run {
                    tokio::time::sleep(options.dry_run_delay).await;
                    RunResult::Simulated
                } else {
                    match self.executor.run(report, task_id.clone(), options.tier, token).await {
                        Ok(outcome) => finished(&outcome),
                        Err(e) => {
                            tracing::warn!(%batch_id, %task_id, error = %e, "batch slot failed");
                            RunResult::Error {
                                message: e.to_string(),
                            }
                        }
                    }
                };
                RunRecord {
                    task_id,
                    score,
                    result,
                    duration_ms: started.elapsed().as_millis() as u64,
                }
            }
        });
        // Barrier: every slot settles before anything is re-ranked.
        let runs = join_all(slots).await;

        let dispatched: HashSet<TaskId> = runs.iter().map(|r| r.task_id.clone()).collect();
        let rescanned = self.scan().await?;
        let next_up = top_pending(&rescanned, &score_options, options.next_up, &dispatched)
            .into_iter()
            .map(|(task_id, score)| NextUp { task_id, score })
            .collect();

        let failed = runs.iter().filter(|r| !r.succeeded()).count();
        tracing::info!(%batch_id, runs = runs.len(), failed, "batch finished");
        Ok(BatchReport {
            batch_id,
            dry_run: options.dry_run,
            runs,
            next_up,
        })
    }

    async fn scan(&self) -> Result<ScanReport, ExecError> {
        let registry = self.registry.clone();
        let backlog_file = self.backlog_file.clone();
        let report = tokio::task::spawn_blocking(move || scan(&registry, &backlog_file, ScanOptions::default()))
            .await
            .map_err(|e| join_err("scan", e))??;
        Ok(report)
    }
}

/// Highest-ranked pending tasks not in `exclude`.
pub fn top_pending(
    report: &ScanReport,
    options: &ScoreOptions,
    limit: usize,
    exclude: &HashSet<TaskId>,
) -> Vec<(TaskId, f64)> {
    rank(report, options)
        .into_iter()
        .filter(|r| r.task.task.status == TaskStatus::Pending)
        .filter(|r| !exclude.contains(&r.task.task.id))
        .take(limit)
        .map(|r| (r.task.task.id.clone(), r.score))
        .collect()
}

fn finished(outcome: &RunOutcome) -> RunResult {
    RunResult::Finished {
        status: outcome.status,
        exit_code: outcome.exit_code,
        cancelled: outcome.cancelled,
    }
}
