//! `foreman scan [--strict] [--json]`

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use foreman_core::{ScanIssue, ScanReport, TaskStatus};

use super::{print_json, Workspace};

/// Merge every project's backlog and report what was found.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Stop at the first malformed backlog or task.
    #[arg(long)]
    pub strict: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Tabled)]
struct ProjectRow {
    #[tabled(rename = "project")]
    project: String,
    #[tabled(rename = "maturity")]
    maturity: String,
    #[tabled(rename = "tasks")]
    tasks: usize,
    #[tabled(rename = "pending")]
    pending: usize,
    #[tabled(rename = "backlog")]
    backlog: String,
}

#[derive(Serialize)]
struct ScanJson<'a> {
    projects: Vec<ProjectRow>,
    tasks: usize,
    errors: &'a [ScanIssue],
    warnings: &'a [ScanIssue],
}

impl ScanArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let report = ws.scan(self.strict)?;
        let rows = project_rows(&report);

        if self.json {
            return print_json(&ScanJson {
                projects: rows,
                tasks: report.tasks().len(),
                errors: &report.errors,
                warnings: &report.warnings,
            });
        }

        println!(
            "{} projects | {} tasks | {} errors | {} warnings",
            rows.len(),
            report.tasks().len(),
            report.errors.len(),
            report.warnings.len()
        );
        if !rows.is_empty() {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        for warning in &report.warnings {
            println!("{} {warning}", "warning:".yellow().bold());
        }
        Ok(())
    }
}

fn project_rows(report: &ScanReport) -> Vec<ProjectRow> {
    report
        .projects()
        .map(|(handle, entry)| {
            let tasks: Vec<_> = report.tasks_of(handle).collect();
            ProjectRow {
                project: entry.name.0.clone(),
                maturity: entry.status.to_string(),
                tasks: tasks.len(),
                pending: tasks
                    .iter()
                    .filter(|t| t.task.status == TaskStatus::Pending)
                    .count(),
                backlog: report.backlog_path(handle).display().to_string(),
            }
        })
        .collect()
}
