pub mod batch;
pub mod conflicts;
pub mod dashboard;
pub mod dispatch;
pub mod init;
pub mod mark;
pub mod milestones;
pub mod rank;
pub mod run;
pub mod scan;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use foreman_core::registry::{self, foreman_dir_at};
use foreman_core::{scan as scan_backlogs, Config, Registry, ScanOptions, ScanReport, StatusTracker};
use foreman_dispatch::{Dispatcher, PreambleRenderer};
use foreman_exec::{ConfiguredTiers, Executor, ProcessWorker};

/// Registry and config loaded for one command.
pub struct Workspace {
    pub home: PathBuf,
    pub registry: Registry,
    pub config: Config,
}

impl Workspace {
    pub fn load() -> Result<Self> {
        let home = home()?;
        let registry = registry::load_at(&home)
            .context("failed to load registry; run `foreman init` first")?;
        let config = Config::load_at(&home).context("failed to load ~/.foreman/config.yaml")?;
        Ok(Self {
            home,
            registry,
            config,
        })
    }

    pub fn scan(&self, strict: bool) -> Result<ScanReport> {
        let report = scan_backlogs(
            &self.registry,
            &self.config.backlog_file,
            ScanOptions { strict },
        )
        .context("scan failed")?;
        for issue in &report.errors {
            eprintln!("error: {issue}");
        }
        Ok(report)
    }

    pub fn tracker(&self) -> StatusTracker {
        StatusTracker::new(self.registry.clone(), self.config.backlog_file.clone())
    }

    /// Embedded templates, overridden by anything under `~/.foreman/templates`.
    pub fn dispatcher(&self) -> Result<Dispatcher> {
        let overrides = foreman_dir_at(&self.home).join("templates");
        let renderer = PreambleRenderer::with_overrides(Some(&overrides))
            .context("failed to load dispatch templates")?;
        Ok(Dispatcher::new(renderer, self.config.dispatch.clone()))
    }

    pub fn executor(&self) -> Result<Executor> {
        Ok(Executor::new(
            Arc::new(self.dispatcher()?),
            Arc::new(self.tracker()),
            Arc::new(ProcessWorker::new(&self.config.worker)),
            Arc::new(ConfiguredTiers::from_env(self.config.local.clone())),
        ))
    }
}

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received; cancelling workers");
            trigger.cancel();
        }
    });
    token
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON")?
    );
    Ok(())
}
