//! `foreman batch [--size N] [--tier ...] [--dry-run] [--focus LABEL] [--json]`

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use foreman_core::Tier;
use foreman_exec::{BatchOptions, BatchOrchestrator, BatchReport, RunResult};

use super::{cancel_on_ctrl_c, print_json, runtime, Workspace};

/// Run the top pending tasks concurrently, then show what is next.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Number of concurrent workers. Defaults to `batch.size` in config.yaml.
    #[arg(long)]
    pub size: Option<usize>,

    /// Execution tier for every task in the batch.
    #[arg(long)]
    pub tier: Option<Tier>,

    /// Simulate each worker with a fixed delay; change nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Favour tasks carrying this label.
    #[arg(long)]
    pub focus: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "task")]
    task: String,
    #[tabled(rename = "score")]
    score: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "time")]
    time: String,
}

impl BatchArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let options = BatchOptions {
            size: self.size.unwrap_or(ws.config.batch.size),
            tier: self.tier,
            dry_run: self.dry_run,
            dry_run_delay: Duration::from_millis(ws.config.batch.dry_run_delay_ms),
            focus_label: self.focus,
            ..BatchOptions::default()
        };
        let orchestrator = BatchOrchestrator::new(
            ws.executor()?,
            ws.registry.clone(),
            ws.config.backlog_file.clone(),
        );

        let report = runtime()?
            .block_on(async {
                let cancel = cancel_on_ctrl_c();
                orchestrator.run(&options, cancel).await
            })
            .context("batch failed")?;

        if self.json {
            return print_json(&report);
        }
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &BatchReport) {
    println!(
        "Batch {}{}",
        report.batch_id,
        if report.dry_run { " (dry run)" } else { "" }
    );
    if report.runs.is_empty() {
        println!("No pending tasks.");
        return;
    }

    let rows: Vec<RunRow> = report
        .runs
        .iter()
        .map(|r| RunRow {
            task: r.task_id.0.clone(),
            score: format!("{:.2}", r.score),
            result: result_label(&r.result),
            time: format!("{:.1}s", r.duration_ms as f64 / 1000.0),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if !report.next_up.is_empty() {
        println!("{}", "Next up:".bold());
        for next in &report.next_up {
            println!("  {:>6.2}  {}", next.score, next.task_id);
        }
    }
}

fn result_label(result: &RunResult) -> String {
    match result {
        RunResult::Finished {
            cancelled: true, ..
        } => "cancelled".yellow().to_string(),
        RunResult::Finished {
            status, exit_code, ..
        } => {
            let code = exit_code.map_or_else(|| "signal".to_string(), |c| format!("exit {c}"));
            let label = format!("{status} ({code})");
            if exit_code == &Some(0) {
                label.green().to_string()
            } else {
                label.red().to_string()
            }
        }
        RunResult::Simulated => "simulated".cyan().to_string(),
        RunResult::Error { message } => message.red().to_string(),
    }
}
