//! Error types for foreman-dispatch.

use std::path::PathBuf;

use thiserror::Error;

use foreman_core::{TaskId, TaskStatus, TrackerError};

/// All errors that can arise while assembling or dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading override templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("task {0} not found in any scanned backlog")]
    UnknownTask(TaskId),

    /// Only pending tasks can be handed to a worker.
    #[error("task {task_id} is {status}; only pending tasks can be dispatched")]
    NotDispatchable { task_id: TaskId, status: TaskStatus },

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}
