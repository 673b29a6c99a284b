//! Worker Executor: dispatch one task, run its worker, record the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use foreman_core::{ScanReport, StatusTracker, TaskId, TaskStatus, Tier, TrackerError, Transition};
use foreman_dispatch::{DispatchDescriptor, Dispatcher};

use crate::error::{join_err, ExecError, WorkerError};
use crate::tier::{resolve_tier, TierStrategy};
use crate::worker::{Worker, WorkerOutput, WorkerRequest};

/// Output lines kept in the history summary of a failed run.
pub const FAILURE_TAIL_LINES: usize = 40;

/// How one worker run ended.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub task_id: TaskId,
    pub tier: Tier,
    /// Status recorded after the run: `completed` or `failed`.
    pub status: TaskStatus,
    pub exit_code: Option<i32>,
    pub cancelled: bool,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub estimated_tokens: usize,
}

/// Shared handles; cheap to clone into concurrent batch slots.
#[derive(Clone)]
pub struct Executor {
    dispatcher: Arc<Dispatcher>,
    tracker: Arc<StatusTracker>,
    worker: Arc<dyn Worker>,
    tiers: Arc<dyn TierStrategy>,
}

impl Executor {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        tracker: Arc<StatusTracker>,
        worker: Arc<dyn Worker>,
        tiers: Arc<dyn TierStrategy>,
    ) -> Self {
        Self {
            dispatcher,
            tracker,
            worker,
            tiers,
        }
    }

    pub fn tracker(&self) -> &Arc<StatusTracker> {
        &self.tracker
    }

    /// Dispatch `task_id`, run the worker and record `completed` or `failed`.
    ///
    /// A worker that exits non-zero is an ordinary `Ok` outcome with status
    /// `failed`. A worker that never starts is [`ExecError::WorkerStart`].
    pub async fn run(
        &self,
        report: Arc<ScanReport>,
        task_id: TaskId,
        tier: Option<Tier>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, ExecError> {
        let started = Instant::now();
        let descriptor = self.dispatch(report, task_id.clone()).await?;
        let tier = resolve_tier(tier, descriptor.tier);
        let backlog = descriptor.backlog_path.clone();
        let request = WorkerRequest {
            task_id: task_id.clone(),
            invocation: self.tiers.invocation(tier),
            working_dir: descriptor.working_dir,
            max_turns: descriptor.max_turns,
            prompt: descriptor.prompt,
        };
        tracing::info!(%task_id, %tier, dir = %request.working_dir.display(), "running worker");

        let result = self.worker.execute(&request, cancel).await;
        let mut outcome = RunOutcome {
            task_id: task_id.clone(),
            tier,
            status: TaskStatus::Failed,
            exit_code: None,
            cancelled: false,
            duration: Duration::ZERO,
            estimated_tokens: descriptor.metadata.estimated_tokens,
        };

        let summary = match result {
            Ok(output) => {
                outcome.exit_code = output.exit_code;
                if output.success() {
                    outcome.status = TaskStatus::Completed;
                }
                summarize(&output)
            }
            Err(WorkerError::Cancelled) => {
                outcome.cancelled = true;
                "worker cancelled".to_string()
            }
            Err(source @ WorkerError::Spawn { .. }) => {
                let recorded = self
                    .record(backlog, task_id.clone(), TaskStatus::Failed, source.to_string())
                    .await;
                let transition = match recorded {
                    Ok(t) => Some(t),
                    Err(e) => {
                        tracing::error!(%task_id, error = %e, "could not record start failure");
                        None
                    }
                };
                return Err(ExecError::WorkerStart {
                    task_id,
                    transition,
                    source,
                });
            }
            Err(other) => other.to_string(),
        };

        if let Err(e) = self.record(backlog, task_id.clone(), outcome.status, summary).await {
            tracing::error!(
                %task_id,
                status = %outcome.status,
                error = %e,
                "could not record run outcome; task left in_progress"
            );
            return Err(e);
        }
        outcome.duration = started.elapsed();
        if outcome.status == TaskStatus::Completed {
            tracing::info!(%task_id, elapsed_ms = outcome.duration.as_millis() as u64, "task completed");
        } else {
            tracing::warn!(%task_id, exit_code = ?outcome.exit_code, "task failed");
        }
        Ok(outcome)
    }

    async fn dispatch(&self, report: Arc<ScanReport>, task_id: TaskId) -> Result<DispatchDescriptor, ExecError> {
        let dispatcher = self.dispatcher.clone();
        let tracker = self.tracker.clone();
        let descriptor = tokio::task::spawn_blocking(move || dispatcher.dispatch(&report, &tracker, &task_id))
            .await
            .map_err(|e| join_err("dispatch", e))??;
        Ok(descriptor)
    }

    async fn record(
        &self,
        backlog: PathBuf,
        task_id: TaskId,
        to: TaskStatus,
        summary: String,
    ) -> Result<Transition, ExecError> {
        let tracker = self.tracker.clone();
        let transition: Result<Transition, TrackerError> =
            tokio::task::spawn_blocking(move || tracker.set_status_in(&backlog, &task_id, to, Some(summary)))
                .await
                .map_err(|e| join_err("status update", e))?;
        Ok(transition?)
    }
}

/// History summary for a finished worker.
fn summarize(output: &WorkerOutput) -> String {
    match output.exit_code {
        Some(0) => "worker exited 0".to_string(),
        code => {
            let head = match code {
                Some(c) => format!("worker exited {c}"),
                None => "worker killed by signal".to_string(),
            };
            let tail = tail_lines(&output.output, FAILURE_TAIL_LINES);
            if tail.is_empty() {
                head
            } else {
                format!("{head}\n{tail}")
            }
        }
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_summary_keeps_last_lines() {
        let output: String = (1..=100).map(|i| format!("line {i}\n")).collect();
        let summary = summarize(&WorkerOutput {
            exit_code: Some(2),
            output,
        });
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "worker exited 2");
        assert_eq!(lines.len(), 1 + FAILURE_TAIL_LINES);
        assert_eq!(lines[1], "line 61");
        assert_eq!(*lines.last().unwrap(), "line 100");
    }

    #[test]
    fn success_summary_is_fixed() {
        let summary = summarize(&WorkerOutput {
            exit_code: Some(0),
            output: "lots of chatter".into(),
        });
        assert_eq!(summary, "worker exited 0");
    }
}
