//! Error types for foreman-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::scanner::ScanIssue;
use crate::types::{TaskId, TaskStatus};

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure, with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (write/save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parse error on load: includes file path and line context from serde_json.
    #[error("failed to parse registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.foreman/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The registry file did not exist at the expected path.
    #[error("registry not found at {path}")]
    RegistryNotFound { path: PathBuf },
}

/// Errors from loading `~/.foreman/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Errors that abort a scan. Non-strict scans only fail on registry problems.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Strict mode stopped at the first violation.
    #[error("strict scan failed: {} error(s), {} warning(s); first: {}", errors.len(), warnings.len(), first_message(errors, warnings))]
    Strict {
        errors: Vec<ScanIssue>,
        warnings: Vec<ScanIssue>,
    },
}

fn first_message(errors: &[ScanIssue], warnings: &[ScanIssue]) -> String {
    errors
        .first()
        .or_else(|| warnings.first())
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Errors from the status tracker's read/modify/write cycle.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse backlog at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("backlog at {path} is not a JSON object with a `tasks` array")]
    Malformed { path: PathBuf },

    #[error("task id '{0}' does not name a registered project")]
    UnknownProject(TaskId),

    #[error("task '{task_id}' not found in {path}")]
    TaskNotFound { task_id: TaskId, path: PathBuf },

    #[error("task '{task_id}' cannot move from {from} to {to}")]
    IllegalTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// Another writer changed the backlog between our read and our rename.
    #[error("backlog at {path} changed during update; re-scan and retry")]
    StaleWrite { path: PathBuf },
}

pub(crate) fn registry_io(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn tracker_io(path: impl Into<PathBuf>, source: std::io::Error) -> TrackerError {
    TrackerError::Io {
        path: path.into(),
        source,
    }
}
