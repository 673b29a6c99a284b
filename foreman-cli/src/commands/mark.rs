//! `foreman mark <task-id> <status> [--summary TEXT]`

use anyhow::{Context, Result};
use clap::Args;

use foreman_core::{TaskId, TaskStatus};

use super::Workspace;

/// Record a status change by hand, with the same rules workers follow.
#[derive(Args, Debug)]
pub struct MarkArgs {
    pub task_id: String,

    /// pending | in_progress | completed | blocked | failed
    pub status: TaskStatus,

    /// Note stored in the task's history.
    #[arg(long)]
    pub summary: Option<String>,
}

impl MarkArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let task_id = TaskId::from(self.task_id);
        let transition = ws
            .tracker()
            .set_status(&task_id, self.status, self.summary)
            .with_context(|| format!("cannot mark {task_id} as {}", self.status))?;
        println!("✓ {}: {} → {}", transition.task_id, transition.from, transition.to);
        Ok(())
    }
}
