//! # foreman-dispatch
//!
//! Builds the request a worker receives for one task: a Tera-rendered
//! preamble followed by as much of the task's relevant files as the size
//! budget allows.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use foreman_core::{config::DispatchConfig, ScanReport, TaskId};
//! use foreman_dispatch::{Dispatcher, PreambleRenderer};
//!
//! fn show(report: &ScanReport, id: &TaskId) {
//!     if let Ok(renderer) = PreambleRenderer::new() {
//!         let dispatcher = Dispatcher::new(renderer, DispatchConfig::default());
//!         if let Ok(descriptor) = dispatcher.preview(report, id) {
//!             println!("{} tokens", descriptor.metadata.estimated_tokens);
//!         }
//!     }
//! }
//! ```

pub mod budget;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod error;

pub use budget::{estimate_tokens, pack_files, Budget, PackedFiles};
pub use context::PreambleContext;
pub use dispatcher::{DispatchDescriptor, DispatchMetadata, Dispatcher};
pub use engine::PreambleRenderer;
pub use error::DispatchError;
