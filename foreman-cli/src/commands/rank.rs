//! `foreman rank [--limit N] [--focus LABEL] [--all] [--json]`

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use foreman_scorer::{rank, Breakdown, ScoreOptions};

use super::{print_json, Workspace};

/// Show tasks in priority order.
#[derive(Args, Debug)]
pub struct RankArgs {
    /// Show at most this many tasks.
    #[arg(long, short = 'n', default_value_t = 10)]
    pub limit: usize,

    /// Favour tasks carrying this label.
    #[arg(long)]
    pub focus: Option<String>,

    /// Include completed and failed tasks.
    #[arg(long)]
    pub all: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RankedJson {
    task_id: String,
    title: String,
    status: String,
    score: f64,
    breakdown: Option<Breakdown>,
}

#[derive(Tabled)]
struct RankRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "score")]
    score: String,
    #[tabled(rename = "task")]
    task: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "")]
    maturity: &'static str,
    #[tabled(rename = "title")]
    title: String,
}

impl RankArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let report = ws.scan(false)?;
        let options = ScoreOptions {
            include_terminal: self.all,
            focus_label: self.focus,
            now: Utc::now(),
        };
        let ranked: Vec<_> = rank(&report, &options).into_iter().take(self.limit).collect();

        if self.json {
            let rows: Vec<RankedJson> = ranked
                .iter()
                .map(|r| RankedJson {
                    task_id: r.task.task.id.0.clone(),
                    title: r.task.task.title.clone(),
                    status: r.task.task.status.to_string(),
                    score: r.score,
                    breakdown: r.breakdown,
                })
                .collect();
            return print_json(&rows);
        }

        if ranked.is_empty() {
            println!("Nothing to rank.");
            return Ok(());
        }
        let rows: Vec<RankRow> = ranked
            .iter()
            .enumerate()
            .map(|(i, r)| RankRow {
                position: i + 1,
                score: if r.breakdown.is_some() {
                    format!("{:.2}", r.score)
                } else {
                    format!("{:.2}*", r.score)
                },
                task: r.task.task.id.0.clone(),
                status: r.task.task.status.to_string(),
                maturity: report.project(r.task.project).status.icon(),
                title: r.task.task.title.clone(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        if ranked.iter().any(|r| r.breakdown.is_none()) {
            println!("* priority override");
        }
        Ok(())
    }
}
