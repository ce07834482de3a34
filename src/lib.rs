//! Harvester Core Library
//!
//! This library provides the core functionality for the harvester tool,
//! which pulls startup profiles from the public Startup India API, enriches
//! them with company-registry contact details, and writes a merged JSON
//! dataset that survives interruption and resumes where it stopped.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Paced HTTP client with retry and exponential backoff
//! - [`api`] - Startup India endpoint bindings behind the [`StartupSource`] trait
//! - [`record`] - Typed records extracted from API payloads and the record merger
//! - [`checkpoint`] - Durable, atomically written checkpoint and result files
//! - [`pipeline`] - The listing → detail → contact phase runner
//! - [`config`] - Pipeline configuration, file loading and validation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod checkpoint;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod record;
mod user_agent;

// Re-export commonly used types
pub use api::{ListingPage, SourceStats, StartupIndiaApi, StartupSource};
pub use checkpoint::{CheckpointError, CheckpointStore, IdSet, Phase, ProgressState, SkippedItem};
pub use config::{ConfigError, Endpoints, FileConfig, PipelineConfig, StateFilter};
pub use fetch::{
    ApiClient, DEFAULT_MAX_RETRIES, FailureType, FetchError, RequestPacer, RetryDecision,
    RetryPolicy, classify_error,
};
pub use pipeline::{NoopObserver, PhaseRunner, PipelineError, ProgressObserver, RunSummary};
pub use record::{ContactInfo, MergedRecord, StartupDetail, StartupRef, is_valid_cin, merge};
