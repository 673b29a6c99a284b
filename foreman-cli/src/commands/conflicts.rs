//! `foreman conflicts [--json]`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use foreman_exec::detect_conflicts;

use super::{print_json, Workspace};

/// Files recorded as modified by more than one task.
#[derive(Args, Debug)]
pub struct ConflictsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ConflictsArgs {
    pub fn run(self) -> Result<()> {
        let ws = Workspace::load()?;
        let report = ws.scan(false)?;
        let conflicts = detect_conflicts(&report);

        if self.json {
            return print_json(&conflicts);
        }
        if conflicts.is_empty() {
            println!("{}", "No conflicts.".green());
            return Ok(());
        }
        println!("{} file(s) touched by more than one task:", conflicts.len());
        for conflict in &conflicts {
            let ids: Vec<String> = conflict.tasks.iter().map(|id| id.to_string()).collect();
            let file = format!("{}:{}", conflict.project, conflict.file.display());
            println!("  {}  {}", file.yellow(), ids.join(", "));
        }
        Ok(())
    }
}
