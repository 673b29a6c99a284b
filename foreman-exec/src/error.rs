use thiserror::Error;

use foreman_core::{ScanError, TaskId, TrackerError, Transition};
use foreman_dispatch::DispatchError;

/// Failures of the worker process itself, as opposed to the task it ran.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to start worker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker I/O error ({context}): {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("worker cancelled")]
    Cancelled,
}

/// Error surface of the executor and batch orchestrator.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("status tracking error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// The worker never ran. `transition` is the recorded move to `failed`,
    /// or `None` if that could not be written either.
    #[error("worker for {task_id} could not start: {source}")]
    WorkerStart {
        task_id: TaskId,
        transition: Option<Transition>,
        #[source]
        source: WorkerError,
    },

    #[error("{0} task join failure")]
    Join(String),
}

pub(crate) fn join_err(what: &str, err: tokio::task::JoinError) -> ExecError {
    ExecError::Join(format!("{what}: {err}"))
}
