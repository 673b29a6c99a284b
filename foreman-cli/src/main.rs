//! Foreman: pick, dispatch and track coding-agent work across many repositories.
//!
//! # Usage
//!
//! ```text
//! foreman init [--root <dir>]
//! foreman scan [--strict] [--json]
//! foreman rank [--limit N] [--focus LABEL] [--all] [--json]
//! foreman dispatch <task-id> [--preview] [--json]
//! foreman run <task-id> [--tier default|local]
//! foreman batch [--size N] [--tier ...] [--dry-run] [--focus LABEL] [--json]
//! foreman mark <task-id> <status> [--summary TEXT]
//! foreman milestones [--project NAME] [--json]
//! foreman conflicts [--json]
//! foreman dashboard [--watch SECS]
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{
    batch::BatchArgs, conflicts::ConflictsArgs, dashboard::DashboardArgs, dispatch::DispatchArgs,
    init::InitArgs, mark::MarkArgs, milestones::MilestonesArgs, rank::RankArgs, run::RunArgs,
    scan::ScanArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "foreman",
    version,
    about = "Prioritize and dispatch backlog tasks across a fleet of repositories",
    long_about = None,
)]
struct Cli {
    /// Log more (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create ~/.foreman/projects.json with an empty registry.
    Init(InitArgs),

    /// Load every registered backlog and report problems.
    Scan(ScanArgs),

    /// Rank tasks by priority score.
    Rank(RankArgs),

    /// Build the worker prompt for a task and mark it in progress.
    Dispatch(DispatchArgs),

    /// Dispatch one task and run a worker on it.
    Run(RunArgs),

    /// Run the top pending tasks concurrently.
    Batch(BatchArgs),

    /// Change a task's status by hand.
    Mark(MarkArgs),

    /// Milestone completion per project.
    Milestones(MilestonesArgs),

    /// Files modified by more than one task.
    Conflicts(ConflictsArgs),

    /// Overview of every project's backlog.
    Dashboard(DashboardArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    foreman_exec::init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Scan(args) => args.run(),
        Commands::Rank(args) => args.run(),
        Commands::Dispatch(args) => args.run(),
        Commands::Run(args) => args.run(),
        Commands::Batch(args) => args.run(),
        Commands::Mark(args) => args.run(),
        Commands::Milestones(args) => args.run(),
        Commands::Conflicts(args) => args.run(),
        Commands::Dashboard(args) => args.run(),
    }
}
