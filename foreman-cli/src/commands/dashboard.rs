//! `foreman dashboard [--watch SECS]`

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use foreman_core::milestone::{aggregate, bar, ecosystem, Progress, BAR_WIDTH};
use foreman_core::{Maturity, ScanReport, ScannedTask, TaskStatus};

use super::Workspace;

/// Completed tasks listed under the table.
const RECENT_COMPLETED: usize = 8;

/// Task counts per project, work in flight and recent completions.
#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Re-render every SECS seconds until interrupted.
    #[arg(long, value_name = "SECS")]
    pub watch: Option<f64>,
}

#[derive(Tabled)]
struct DashboardRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Status")]
    icon: String,
    #[tabled(rename = "Pend")]
    pending: String,
    #[tabled(rename = "Run")]
    running: String,
    #[tabled(rename = "Done")]
    done: String,
    #[tabled(rename = "Blk")]
    blocked: String,
    #[tabled(rename = "Fail")]
    failed: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Milestone")]
    milestone: String,
}

impl DashboardArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let Some(secs) = self.watch else {
            print!("{}", render(&ws.scan(false)?));
            return Ok(());
        };

        let interval = Duration::try_from_secs_f64(secs.max(0.5))
            .with_context(|| format!("invalid watch interval '{secs}'"))?;
        loop {
            let report = ws.scan(false)?;
            // Clear screen, cursor home.
            print!("\x1b[2J\x1b[H{}", render(&report));
            std::thread::sleep(interval);
        }
    }
}

pub fn render(report: &ScanReport) -> String {
    let rows = aggregate(report, None);
    let mut table_rows: Vec<DashboardRow> = report
        .projects()
        .zip(&rows)
        .map(|((_, entry), progress)| row(&entry.name.0, icon(entry.status), progress))
        .collect();
    let total = ecosystem(&rows);
    let mut total_row = row("TOTAL", String::new(), &total);
    total_row.milestone = format!("{}/{} tasks", total.completed, total.total);
    table_rows.push(total_row);

    let mut out = String::new();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    let _ = writeln!(out, "{}", "foreman task dashboard".bold());
    let _ = writeln!(out, "{table}");

    let in_progress: Vec<&ScannedTask> = report
        .tasks()
        .iter()
        .filter(|t| t.task.status == TaskStatus::InProgress)
        .collect();
    let _ = writeln!(out, "{}", "In progress".cyan().bold());
    if in_progress.is_empty() {
        let _ = writeln!(out, "  {}", "No tasks in progress".dimmed());
    }
    for t in in_progress {
        let _ = writeln!(out, "  {} {}: {}", ">".cyan(), project_name(report, t).bold(), t.task.title);
    }

    let _ = writeln!(out, "{}", "Recently completed".green().bold());
    let recent = recent_completed(report, RECENT_COMPLETED);
    if recent.is_empty() {
        let _ = writeln!(out, "  {}", "Nothing completed yet".dimmed());
    }
    for t in recent {
        let _ = writeln!(out, "  {} {}: {}", "✓".green(), project_name(report, t), t.task.title);
    }
    out
}

fn row(name: &str, icon: String, p: &Progress) -> DashboardRow {
    let blank_zero = |n: usize| if n == 0 { String::new() } else { n.to_string() };
    let progress = if p.total == 0 {
        format!("{}  --", "-".repeat(BAR_WIDTH))
    } else {
        format!("{} {:>3}%", bar(p.percent, BAR_WIDTH), p.percent)
    };
    DashboardRow {
        project: name.to_string(),
        icon,
        pending: blank_zero(p.pending - p.blocked - p.failed),
        running: blank_zero(p.in_progress),
        done: blank_zero(p.completed),
        blocked: blank_zero(p.blocked),
        failed: blank_zero(p.failed),
        progress,
        milestone: p.milestone.clone().unwrap_or_default(),
    }
}

fn icon(maturity: Maturity) -> String {
    let text = maturity.icon();
    match maturity {
        Maturity::Buildable => text.green().to_string(),
        Maturity::NearBuildable | Maturity::ScaffoldingPlus => text.yellow().to_string(),
        Maturity::Scaffolding => text.dimmed().to_string(),
        Maturity::Blocked => text.red().to_string(),
        Maturity::Unknown => text.to_string(),
    }
}

fn project_name<'a>(report: &'a ScanReport, t: &ScannedTask) -> &'a str {
    &report.project(t.project).name.0
}

/// Last `n` completed tasks, oldest first, by the time they were completed.
fn recent_completed(report: &ScanReport, n: usize) -> Vec<&ScannedTask> {
    let mut done: Vec<&ScannedTask> = report
        .tasks()
        .iter()
        .filter(|t| t.task.status == TaskStatus::Completed)
        .collect();
    done.sort_by_key(|t| {
        t.task
            .history
            .iter()
            .rev()
            .find(|h| h.to == TaskStatus::Completed)
            .map(|h| h.timestamp)
    });
    let skip = done.len().saturating_sub(n);
    done.into_iter().skip(skip).collect()
}
