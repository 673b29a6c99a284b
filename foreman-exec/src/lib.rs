//! Worker execution: the [`Worker`] seam, execution tiers, the single-task
//! [`Executor`], the [`BatchOrchestrator`] and the conflict detector.

pub mod batch;
pub mod conflict;
mod error;
pub mod executor;
mod logging;
pub mod tier;
pub mod worker;

pub use batch::{BatchOptions, BatchOrchestrator, BatchReport, NextUp, RunRecord, RunResult};
pub use conflict::{detect as detect_conflicts, Conflict};
pub use error::{ExecError, WorkerError};
pub use executor::{Executor, RunOutcome};
pub use logging::init_tracing;
pub use tier::{ConfiguredTiers, Invocation, TierStrategy};
pub use worker::{ProcessWorker, Worker, WorkerOutput, WorkerRequest};
