//! Paced HTTP client with retry and exponential backoff.
//!
//! This module provides the request layer every pipeline phase goes through:
//! a fixed inter-request delay, failure classification, and bounded retries
//! for transient failures.
//!
//! # Features
//!
//! - Fixed pacing delay before every request; retries wait only for their backoff
//! - Exponential backoff for timeouts, connection errors, 429 and 5xx
//! - `Retry-After` support on 429 responses
//! - Non-retriable 4xx responses fail fast so the caller can skip the item
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use harvester_core::fetch::{ApiClient, RequestPacer, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pacer = RequestPacer::new(Duration::from_millis(500));
//! let retry = RetryPolicy::new(3, Duration::from_millis(500), Duration::from_secs(60), 2.0);
//! let client = ApiClient::new(pacer, retry, Duration::from_secs(30))?;
//! let body = client.get_json("https://example.com/profile/abc", &[]).await?;
//! println!("{body}");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
pub mod pacer;
mod retry;

pub use client::{ApiClient, ApiResponse};
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_MAX_BACKOFF, REQUEST_TIMEOUT_SECS};
pub use error::FetchError;
pub use pacer::{RequestPacer, parse_retry_after};
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
