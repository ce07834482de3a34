//! Fixed-delay request pacing.
//!
//! This module provides the [`RequestPacer`], which sleeps for a configured
//! delay before every outgoing request so the harvester stays under the
//! upstream API's request rate. Requests are issued one at a time, so the
//! pacer is a plain sleep rather than a per-host scheduler.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use harvester_core::fetch::RequestPacer;
//!
//! # async fn example() {
//! let pacer = RequestPacer::new(Duration::from_millis(500));
//!
//! // Every call waits the full delay before returning.
//! pacer.acquire().await;
//! pacer.acquire().await;
//! assert_eq!(pacer.requests(), 2);
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use super::constants::MAX_RETRY_AFTER;

/// Fixed-delay pacer applied before every API request.
///
/// `RequestPacer` is `Send + Sync`; counters are atomics so it can sit behind
/// a shared reference inside the API client.
#[derive(Debug)]
pub struct RequestPacer {
    /// Delay applied before each request.
    delay: Duration,

    /// Whether pacing is disabled (for `--rate-limit 0`).
    disabled: bool,

    /// Number of requests that went through the pacer.
    requests: AtomicU64,

    /// Total time spent sleeping in the pacer (milliseconds).
    cumulative_delay_ms: AtomicU64,
}

impl RequestPacer {
    /// Creates a pacer with the given inter-request delay.
    ///
    /// A zero delay is equivalent to [`RequestPacer::disabled`].
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = delay.as_millis()))]
    pub fn new(delay: Duration) -> Self {
        if delay.is_zero() {
            return Self::disabled();
        }
        debug!("creating request pacer");
        Self {
            delay,
            disabled: false,
            requests: AtomicU64::new(0),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Creates a disabled pacer that applies no delays.
    #[must_use]
    pub fn disabled() -> Self {
        debug!("creating disabled request pacer");
        Self {
            delay: Duration::ZERO,
            disabled: true,
            requests: AtomicU64::new(0),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Returns whether pacing is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the delay applied before each request.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the number of requests that have passed through the pacer.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Returns the total time spent waiting in the pacer.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        Duration::from_millis(self.cumulative_delay_ms.load(Ordering::SeqCst))
    }

    /// Waits the configured delay before a request is sent.
    pub async fn acquire(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.disabled {
            return;
        }

        trace!(delay_ms = self.delay.as_millis(), "pacing request");
        tokio::time::sleep(self.delay).await;

        let delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX);
        self.cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst);
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// The Retry-After header can be either:
/// - An integer number of seconds (e.g., "120")
/// - An HTTP-date (e.g., "Wed, 21 Oct 2015 07:28:00 GMT")
///
/// # Returns
///
/// - `Some(Duration)` if parsing succeeds, capped at 1 hour
/// - `None` if parsing fails or the value is negative
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use harvester_core::fetch::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        let Ok(seconds) = u64::try_from(seconds) else {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        };
        let duration = Duration::from_secs(seconds);
        if duration > MAX_RETRY_AFTER {
            warn!(
                seconds,
                max_seconds = MAX_RETRY_AFTER.as_secs(),
                "Retry-After exceeds maximum, capping at 1 hour"
            );
            return Some(MAX_RETRY_AFTER);
        }
        return Some(duration);
    }

    let Ok(datetime) = httpdate::parse_http_date(header_value) else {
        debug!(header_value, "unparseable Retry-After value");
        return None;
    };

    match datetime.duration_since(std::time::SystemTime::now()) {
        Ok(duration) if duration > MAX_RETRY_AFTER => {
            warn!(
                delay_secs = duration.as_secs(),
                max_secs = MAX_RETRY_AFTER.as_secs(),
                "Retry-After date exceeds maximum, capping at 1 hour"
            );
            Some(MAX_RETRY_AFTER)
        }
        Ok(duration) => Some(duration),
        // Date is in the past
        Err(_) => Some(Duration::ZERO),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_zero_delay_is_disabled() {
        let pacer = RequestPacer::new(Duration::ZERO);
        assert!(pacer.is_disabled());
    }

    #[tokio::test]
    async fn test_disabled_pacer_counts_requests_without_delay() {
        let pacer = RequestPacer::disabled();
        pacer.acquire().await;
        pacer.acquire().await;
        assert_eq!(pacer.requests(), 2);
        assert_eq!(pacer.cumulative_delay(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_sleeps_before_every_request() {
        let pacer = RequestPacer::new(Duration::from_millis(500));
        let start = tokio::time::Instant::now();

        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(pacer.requests(), 3);
        assert_eq!(pacer.cumulative_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_retry_after_negative_ignored() {
        assert_eq!(parse_retry_after("-10"), None);
    }

    #[test]
    fn test_parse_retry_after_capped_at_one_hour() {
        assert_eq!(parse_retry_after("999999"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_past_http_date_is_zero() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_parse_retry_after_garbage() {
        assert_eq!(parse_retry_after("soon"), None);
    }
}
