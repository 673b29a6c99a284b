//! Foreman core library: domain types, registry, configuration, backlog
//! scanning, status tracking and milestone aggregation.
//!
//! - [`types`]: newtypes, task records, back-reference handles
//! - [`error`]: one error enum per concern
//! - [`registry`]: load / save / init of `~/.foreman/projects.json`
//! - [`config`]: `~/.foreman/config.yaml`
//! - [`scanner`]: merge every project's backlog
//! - [`tracker`]: the single writer of task status and history
//! - [`milestone`]: completion percentages

pub mod config;
pub mod error;
pub mod milestone;
pub mod registry;
pub mod scanner;
pub mod tracker;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, RegistryError, ScanError, TrackerError};
pub use scanner::{scan, ScanIssue, ScanOptions, ScanReport};
pub use tracker::{StatusTracker, Transition};
pub use types::{
    Complexity, Feature, HistoryEntry, Maturity, Milestone, MilestoneRef, ProjectEntry,
    ProjectName, ProjectRef, Registry, ScannedTask, Task, TaskId, TaskStatus, Tier,
};
