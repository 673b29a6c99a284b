//! Dispatcher: turns one scanned task into a bounded worker request.

use std::path::PathBuf;

use serde::Serialize;

use foreman_core::config::DispatchConfig;
use foreman_core::{ScanReport, StatusTracker, TaskId, TaskStatus, Tier};

use crate::budget::{estimate_tokens, pack_files, Budget};
use crate::context::PreambleContext;
use crate::engine::PreambleRenderer;
use crate::error::DispatchError;

/// Size accounting for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchMetadata {
    pub estimated_tokens: usize,
    pub budget_tokens: usize,
    pub preamble_tokens: usize,
    pub files_included: Vec<PathBuf>,
    pub files_truncated: Vec<PathBuf>,
    pub files_skipped: Vec<PathBuf>,
}

/// Everything a worker needs for one task. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchDescriptor {
    pub task_id: TaskId,
    pub prompt: String,
    pub working_dir: PathBuf,
    /// Backlog file the task was scanned from; status writes go here.
    pub backlog_path: PathBuf,
    pub max_turns: u32,
    /// The task's own tier hint, if any.
    pub tier: Option<Tier>,
    pub prior_status: TaskStatus,
    pub metadata: DispatchMetadata,
}

impl DispatchDescriptor {
    pub fn over_budget(&self) -> bool {
        self.metadata.estimated_tokens > self.metadata.budget_tokens
    }
}

pub struct Dispatcher {
    renderer: PreambleRenderer,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(renderer: PreambleRenderer, config: DispatchConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Assemble the request without touching any backlog.
    pub fn preview(&self, report: &ScanReport, task_id: &TaskId) -> Result<DispatchDescriptor, DispatchError> {
        let scanned = report
            .find(task_id)
            .ok_or_else(|| DispatchError::UnknownTask(task_id.clone()))?;
        if scanned.task.status != TaskStatus::Pending {
            return Err(DispatchError::NotDispatchable {
                task_id: task_id.clone(),
                status: scanned.task.status,
            });
        }

        let budget = Budget::from(&self.config);
        let ctx = PreambleContext::from_task(report, scanned, self.config.max_turns);
        let preamble = self.renderer.render(&ctx)?;
        let preamble_tokens = estimate_tokens(&preamble, budget.chars_per_token);

        let working_dir = report.project_dir(scanned.project).to_path_buf();
        let packed = pack_files(
            &working_dir,
            &scanned.task.relevant_files,
            budget.file_budget(preamble_tokens),
            &budget,
        );

        let mut prompt = preamble;
        if !packed.text.is_empty() {
            prompt.push_str("\n## Relevant files\n\n");
            prompt.push_str(&packed.text);
        }
        let estimated_tokens = estimate_tokens(&prompt, budget.chars_per_token);

        let descriptor = DispatchDescriptor {
            task_id: task_id.clone(),
            prompt,
            working_dir,
            backlog_path: report.backlog_path(scanned.project).to_path_buf(),
            max_turns: self.config.max_turns,
            tier: scanned.task.execution_tier,
            prior_status: scanned.task.status,
            metadata: DispatchMetadata {
                estimated_tokens,
                budget_tokens: budget.total,
                preamble_tokens,
                files_included: packed.included,
                files_truncated: packed.truncated,
                files_skipped: packed.skipped,
            },
        };
        if descriptor.over_budget() {
            tracing::warn!(
                %task_id,
                tokens = estimated_tokens,
                budget = budget.total,
                "request exceeds size budget; dispatching anyway"
            );
        }
        Ok(descriptor)
    }

    /// [`preview`](Self::preview), then move the task to `in_progress`.
    pub fn dispatch(
        &self,
        report: &ScanReport,
        tracker: &StatusTracker,
        task_id: &TaskId,
    ) -> Result<DispatchDescriptor, DispatchError> {
        let mut descriptor = self.preview(report, task_id)?;
        let transition = tracker.set_status_in(
            &descriptor.backlog_path,
            task_id,
            TaskStatus::InProgress,
            Some("dispatched".into()),
        )?;
        descriptor.prior_status = transition.from;
        tracing::info!(
            %task_id,
            tokens = descriptor.metadata.estimated_tokens,
            dir = %descriptor.working_dir.display(),
            "task dispatched"
        );
        Ok(descriptor)
    }
}
