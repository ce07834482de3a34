//! Startup India API bindings.
//!
//! The pipeline talks to the outside world only through the
//! [`StartupSource`] trait. [`StartupIndiaApi`] is the real implementation;
//! tests substitute their own sources to script responses or failures.

mod listing;

pub use listing::{ListingPage, listing_payload};

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{Endpoints, StateFilter};
use crate::fetch::{ApiClient, FetchError};
use crate::record::ContactInfo;

/// Request counters reported in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// HTTP requests attempted, retries included.
    pub requests: u64,
    /// Retries performed after failed attempts.
    pub retries: usize,
    /// Total time spent in the fixed inter-request delay.
    pub pacing_delay: Duration,
}

/// Data source for the three pipeline phases.
///
/// Uses `async_trait` so the runner can hold a `Box<dyn StartupSource>`.
#[async_trait]
pub trait StartupSource: Send + Sync {
    /// Fetches one listing page (0-based).
    async fn list_page(&self, page: u32, states: &StateFilter) -> Result<ListingPage, FetchError>;

    /// Fetches the raw profile body for `id`.
    async fn fetch_detail(&self, id: &str) -> Result<Value, FetchError>;

    /// Looks up registry contact data for a well-formed CIN.
    ///
    /// `Ok(None)` means the registry had nothing for this CIN.
    async fn fetch_contact(&self, cin: &str) -> Result<Option<ContactInfo>, FetchError>;

    /// Request counters so far; zero for sources without an HTTP layer.
    fn stats(&self) -> SourceStats {
        SourceStats::default()
    }
}

/// [`StartupSource`] backed by the public Startup India endpoints.
#[derive(Debug)]
pub struct StartupIndiaApi {
    client: ApiClient,
    endpoints: Endpoints,
}

impl StartupIndiaApi {
    #[must_use]
    pub fn new(client: ApiClient, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// `{details}/{id}` with `id` percent-encoded as a single path segment.
    fn detail_url(&self, id: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.endpoints.details)
            .map_err(|_| FetchError::invalid_url(&self.endpoints.details))?;
        url.path_segments_mut()
            .map_err(|()| FetchError::invalid_url(&self.endpoints.details))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl StartupSource for StartupIndiaApi {
    #[instrument(skip(self, states), fields(states = %states.label()))]
    async fn list_page(&self, page: u32, states: &StateFilter) -> Result<ListingPage, FetchError> {
        let payload = listing_payload(page, states);
        let body = self.client.post_json(&self.endpoints.listing, &payload).await?;
        let listing = ListingPage::from_body(&body);
        debug!(
            ids = listing.refs.len(),
            total_pages = ?listing.total_pages,
            "listing page fetched"
        );
        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn fetch_detail(&self, id: &str) -> Result<Value, FetchError> {
        let url = self.detail_url(id)?;
        self.client.get_json(url.as_str(), &[]).await
    }

    #[instrument(skip(self))]
    async fn fetch_contact(&self, cin: &str) -> Result<Option<ContactInfo>, FetchError> {
        let body = self
            .client
            .get_json(&self.endpoints.cin, &[("cin", cin)])
            .await?;
        Ok(ContactInfo::from_cin_response(&body))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            requests: self.client.pacer().requests()
                + u64::try_from(self.client.retried()).unwrap_or(u64::MAX),
            retries: self.client.retried(),
            pacing_delay: self.client.pacer().cumulative_delay(),
        }
    }
}
