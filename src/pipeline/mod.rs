//! Resumable listing → detail → contact pipeline.
//!
//! [`PhaseRunner`] drives the state machine `LISTING → DETAIL → CONTACT → DONE`
//! against a [`crate::api::StartupSource`], persisting through a
//! [`crate::checkpoint::CheckpointStore`]. Per-item failures are recorded and
//! skipped; only checkpoint and configuration errors stop a run.

mod observer;
mod runner;
mod summary;

pub use observer::{NoopObserver, ProgressObserver};
pub use runner::{MAX_CONSECUTIVE_PAGE_FAILURES, PhaseRunner};
pub use summary::RunSummary;

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;

/// Errors that halt a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Checkpoint or result persistence failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The configuration was rejected before any request was made.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
