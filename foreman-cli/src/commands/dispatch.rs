//! `foreman dispatch <task-id> [--preview] [--json]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use foreman_core::TaskId;
use foreman_dispatch::DispatchDescriptor;

use super::{print_json, Workspace};

/// Build the worker request for one task and print it.
///
/// Without `--preview` the task is moved to `in_progress`, for operators who
/// hand the request to a worker themselves.
#[derive(Args, Debug)]
pub struct DispatchArgs {
    pub task_id: String,

    /// Only assemble the request; leave the backlog untouched.
    #[arg(long)]
    pub preview: bool,

    /// Emit the full descriptor as JSON.
    #[arg(long)]
    pub json: bool,
}

impl DispatchArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let report = ws.scan(false)?;
        let dispatcher = ws.dispatcher()?;
        let task_id = TaskId::from(self.task_id);

        let descriptor = if self.preview {
            dispatcher.preview(&report, &task_id)
        } else {
            dispatcher.dispatch(&report, &ws.tracker(), &task_id)
        }
        .with_context(|| format!("failed to dispatch {task_id}"))?;

        if self.json {
            return print_json(&descriptor);
        }
        println!("{}", descriptor.prompt);
        eprintln!("{}", summary_line(&descriptor, self.preview));
        Ok(())
    }
}

fn summary_line(d: &DispatchDescriptor, preview: bool) -> String {
    let m = &d.metadata;
    let size = format!("~{} / {} tokens", m.estimated_tokens, m.budget_tokens);
    let size = if d.over_budget() {
        size.red().bold().to_string()
    } else {
        size.green().to_string()
    };
    format!(
        "{} {} | {} | files: {} whole, {} truncated, {} skipped{}",
        if preview { "preview" } else { "dispatched" },
        d.task_id,
        size,
        m.files_included.len(),
        m.files_truncated.len(),
        m.files_skipped.len(),
        if preview {
            String::new()
        } else {
            format!(" | was {}", d.prior_status)
        },
    )
}
