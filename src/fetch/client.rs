//! HTTP client wrapper for JSON API calls.
//!
//! This module provides the [`ApiClient`] struct which applies request pacing,
//! classifies failures, and retries transient ones with exponential backoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::FetchError;
use super::pacer::{RequestPacer, parse_retry_after};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// A successful (2xx) HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

/// Paced, retrying HTTP client for the harvester's API calls.
///
/// Designed to be created once per run and reused for every request so
/// connections are pooled. Requests are issued one at a time by the caller;
/// the client itself never fans out.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use harvester_core::fetch::{ApiClient, RequestPacer, RetryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(RequestPacer::disabled(), RetryPolicy::default(), Duration::from_secs(30))?;
/// let page = client.post_json("https://example.com/search", &serde_json::json!({"page": 0})).await?;
/// println!("{page}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    pacer: RequestPacer,
    retry_policy: RetryPolicy,
    retried: AtomicUsize,
}

impl ApiClient {
    /// Creates a new API client.
    ///
    /// Configuration:
    /// - Connect timeout: 10 seconds
    /// - Request timeout: `request_timeout`
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(
        pacer: RequestPacer,
        retry_policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(request_timeout)
            .user_agent(user_agent::default_user_agent())
            .gzip(true)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;

        Ok(Self {
            client,
            pacer,
            retry_policy,
            retried: AtomicUsize::new(0),
        })
    }

    /// Returns the request pacer.
    #[must_use]
    pub fn pacer(&self) -> &RequestPacer {
        &self.pacer
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the number of retries performed so far.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Issues a request, retrying transient failures.
    ///
    /// The pacer delay is applied once, before the first attempt; retries
    /// wait only for their backoff delay. `query` pairs are
    /// appended to the URL; `json_body`, when present, is sent as JSON.
    ///
    /// # Errors
    ///
    /// Returns the last [`FetchError`] once the failure is permanent or the
    /// retry budget is exhausted.
    #[instrument(skip(self, query, json_body), fields(method = %method, url = %url))]
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        json_body: Option<&Value>,
    ) -> Result<ApiResponse, FetchError> {
        let target = build_url(url, query)?;
        let mut attempt = 1;

        self.pacer.acquire().await;

        loop {

            let error = match self.send_once(method.clone(), &target, json_body).await {
                Ok(response) => {
                    debug!(attempt, status = response.status, "request succeeded");
                    return Ok(response);
                }
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            match self.retry_policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    let delay = retry_after_floor(&error, failure_type)
                        .map_or(delay, |retry_after| retry_after.max(delay));
                    warn!(
                        url = %target,
                        error = %error,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "request failed, retrying"
                    );
                    self.retried.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %target, attempt, reason = %reason, "giving up on request");
                    return Err(error);
                }
            }
        }
    }

    /// GETs `url` with `query` and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on request failure or when the body is not JSON.
    pub async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        let response = self.request(Method::GET, url, query, None).await?;
        decode_json(url, &response.body)
    }

    /// POSTs `body` as JSON to `url` and decodes the response as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on request failure or when the body is not JSON.
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, FetchError> {
        let response = self.request(Method::POST, url, &[], Some(body)).await?;
        decode_json(url, &response.body)
    }

    async fn send_once(
        &self,
        method: Method,
        target: &Url,
        json_body: Option<&Value>,
    ) -> Result<ApiResponse, FetchError> {
        let mut request = self.client.request(method, target.clone());
        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(target.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            return Err(FetchError::http_status_with_retry_after(
                target.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(target.as_str(), e))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn build_url(url: &str, query: &[(&str, &str)]) -> Result<Url, FetchError> {
    let mut parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::invalid_url(url));
    }
    if !query.is_empty() {
        parsed.query_pairs_mut().extend_pairs(query);
    }
    Ok(parsed)
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url)
    } else {
        FetchError::network(url, error)
    }
}

fn decode_json(url: &str, body: &str) -> Result<Value, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::decode(url, "empty response body"));
    }
    serde_json::from_str(body).map_err(|e| FetchError::decode(url, e.to_string()))
}

/// Minimum wait demanded by the server on a 429 response.
fn retry_after_floor(error: &FetchError, failure_type: FailureType) -> Option<Duration> {
    if failure_type != FailureType::RateLimited {
        return None;
    }
    match error {
        FetchError::HttpStatus {
            retry_after: Some(value),
            ..
        } => parse_retry_after(value),
        _ => None,
    }
}
