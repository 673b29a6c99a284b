//! `foreman run <task-id> [--tier default|local]`

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use foreman_core::{TaskId, TaskStatus, Tier};

use super::{cancel_on_ctrl_c, runtime, Workspace};

/// Dispatch one task and run its worker to completion.
#[derive(Args, Debug)]
pub struct RunArgs {
    pub task_id: String,

    /// Execution tier; overrides the task's own hint.
    #[arg(long)]
    pub tier: Option<Tier>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let report = Arc::new(ws.scan(false)?);
        let executor = ws.executor()?;
        let task_id = TaskId::from(self.task_id);

        let outcome = runtime()?.block_on(async {
            let cancel = cancel_on_ctrl_c();
            executor.run(report, task_id.clone(), self.tier, cancel).await
        });
        let outcome = outcome.with_context(|| format!("run of {task_id} failed"))?;

        let status = match outcome.status {
            TaskStatus::Completed => "completed".green().bold(),
            _ => "failed".red().bold(),
        };
        println!(
            "{} {} [{}] in {:.1}s (exit {})",
            outcome.task_id,
            status,
            outcome.tier,
            outcome.duration.as_secs_f64(),
            outcome
                .exit_code
                .map_or_else(|| "none".to_string(), |c| c.to_string()),
        );
        if outcome.status != TaskStatus::Completed {
            bail!("{} did not complete", outcome.task_id);
        }
        Ok(())
    }
}
