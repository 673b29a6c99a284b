//! `foreman milestones [--project NAME] [--json]`

use anyhow::{bail, Result};
use clap::Args;

use foreman_core::milestone::{aggregate, ecosystem, render_table, Progress};

use super::{print_json, Workspace};

/// Completion per project against its active milestone.
#[derive(Args, Debug)]
pub struct MilestonesArgs {
    /// Only this project.
    #[arg(long)]
    pub project: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(serde::Serialize)]
struct MilestonesJson {
    projects: Vec<Progress>,
    total: Progress,
}

impl MilestonesArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        if let Some(name) = self.project.as_deref() {
            if ws.registry.find(name).is_none() {
                bail!("project '{name}' is not in the registry");
            }
        }
        let report = ws.scan(false)?;
        let rows = aggregate(&report, self.project.as_deref());

        if self.json {
            let total = ecosystem(&rows);
            return print_json(&MilestonesJson {
                projects: rows,
                total,
            });
        }
        print!("{}", render_table(&rows));
        Ok(())
    }
}
