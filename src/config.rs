//! Pipeline configuration.
//!
//! [`PipelineConfig`] is the single, explicit settings object handed to the
//! phase runner. It starts from built-in defaults, is overlaid by an optional
//! JSON [`FileConfig`] and finally by command-line flags in the binary.
//! [`PipelineConfig::validate`] must pass before any network call is made.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::checkpoint::RESULTS_FILE;
use crate::fetch::{
    ApiClient, DEFAULT_BASE_DELAY, DEFAULT_MAX_BACKOFF, FetchError, REQUEST_TIMEOUT_SECS,
    RequestPacer, RetryPolicy,
};

/// Startup India profile search endpoint.
pub const DEFAULT_LISTING_URL: &str =
    "https://api.startupindia.gov.in/sih/api/noauth/search/profiles";
/// Startup India public profile endpoint; the id is appended as a path segment.
pub const DEFAULT_DETAILS_URL: &str =
    "https://api.startupindia.gov.in/sih/api/common/replica/user/profile/";
/// Company registry lookup by CIN.
pub const DEFAULT_CIN_URL: &str =
    "https://api.startupindia.gov.in/sih/api/noauth/dpiit/services/cin/info";
/// Chhattisgarh.
pub const DEFAULT_STATE_ID: &str = "5f48ce592a9bb065cdf9fb25";
/// Seconds between requests.
pub const DEFAULT_RATE_LIMIT_DELAY_SECS: f64 = 0.5;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: f64 = 2.0;
/// Items processed between two flushes.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 50;
/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Maximum accepted `retry_attempts`.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;
const MAX_RATE_LIMIT_DELAY_SECS: f64 = 60.0;
const MAX_RETRY_BACKOFF: f64 = 10.0;
const MAX_RETRY_JITTER_MS: u64 = 10_000;
const MAX_CHECKPOINT_INTERVAL: usize = 10_000;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Configuration errors. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but cannot be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON or has unknown keys.
    #[error("invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A state id that is neither `all` nor a 24-character hex id.
    #[error("invalid state id '{value}': expected a 24-character hex id or 'all'")]
    InvalidStateId { value: String },

    /// An endpoint that is not an absolute http(s) URL.
    #[error("invalid URL for `{field}`: '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    /// A numeric setting outside its accepted range.
    #[error("invalid value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

// ==================== Endpoints / States ====================

/// The three API endpoints the pipeline talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub listing: String,
    pub details: String,
    pub cin: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            listing: DEFAULT_LISTING_URL.to_string(),
            details: DEFAULT_DETAILS_URL.to_string(),
            cin: DEFAULT_CIN_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at `base` (used by tests against a mock server).
    #[must_use]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            listing: format!("{base}/search/profiles"),
            details: format!("{base}/profile/"),
            cin: format!("{base}/cin/info"),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("listing_api_url", &self.listing),
            ("details_api_url", &self.details),
            ("cin_api_url", &self.cin),
        ] {
            let valid = Url::parse(value)
                .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
            if !valid {
                return Err(ConfigError::InvalidUrl {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Which states the listing phase searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    /// No state filter.
    All,
    /// One or more state ids.
    States(Vec<String>),
}

impl Default for StateFilter {
    fn default() -> Self {
        Self::States(vec![DEFAULT_STATE_ID.to_string()])
    }
}

impl StateFilter {
    /// Builds a filter from user-supplied ids; any `all` entry selects every state.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidStateId`] for a malformed id or an empty list.
    pub fn from_ids<I, S>(ids: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut states = Vec::new();
        for raw in ids {
            let id = raw.as_ref().trim();
            if id.eq_ignore_ascii_case("all") {
                return Ok(Self::All);
            }
            if !is_state_id(id) {
                return Err(ConfigError::InvalidStateId {
                    value: id.to_string(),
                });
            }
            let id = id.to_ascii_lowercase();
            if !states.contains(&id) {
                states.push(id);
            }
        }
        if states.is_empty() {
            return Err(ConfigError::InvalidStateId {
                value: String::new(),
            });
        }
        Ok(Self::States(states))
    }

    /// The `states` array sent in the listing body; empty means every state.
    #[must_use]
    pub fn payload_states(&self) -> Vec<String> {
        match self {
            Self::All => Vec::new(),
            Self::States(states) => states.clone(),
        }
    }

    /// Human-readable form for logs and `harvester config`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::States(states) => states.join(","),
        }
    }
}

fn is_state_id(value: &str) -> bool {
    value.len() == 24 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

// ==================== PipelineConfig ====================

/// Effective settings for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub endpoints: Endpoints,
    pub states: StateFilter,
    /// Fixed delay before every request; also the first backoff step when
    /// it exceeds the 0.5 s floor.
    pub rate_limit_delay: Duration,
    /// Retries after the initial attempt.
    pub retry_attempts: u32,
    pub retry_backoff: f64,
    pub retry_jitter: Duration,
    pub checkpoint_interval: usize,
    pub request_timeout: Duration,
    /// Directory holding checkpoint files.
    pub data_dir: PathBuf,
    /// Result file; defaults to `startups_data.json` inside `data_dir`.
    pub output_file: Option<PathBuf>,
    /// Stop after this many items in this invocation.
    pub limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            states: StateFilter::default(),
            rate_limit_delay: Duration::from_millis(500),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            retry_jitter: Duration::ZERO,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            data_dir: PathBuf::from("."),
            output_file: None,
            limit: None,
        }
    }
}

impl PipelineConfig {
    /// Checks every setting; must pass before any network call.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoints.validate()?;
        if let StateFilter::States(states) = &self.states {
            StateFilter::from_ids(states)?;
        }
        validate_delay_secs(self.rate_limit_delay.as_secs_f64())?;
        validate_retry_attempts(self.retry_attempts)?;
        validate_backoff(self.retry_backoff)?;
        let jitter_ms = u64::try_from(self.retry_jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms > MAX_RETRY_JITTER_MS {
            return Err(ConfigError::out_of_range(
                "retry_jitter_ms",
                jitter_ms,
                "0..=10000",
            ));
        }
        validate_checkpoint_interval(self.checkpoint_interval)?;
        let timeout = self.request_timeout.as_secs();
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&timeout) {
            return Err(ConfigError::out_of_range(
                "request_timeout_secs",
                timeout,
                "1..=600",
            ));
        }
        if self.limit == Some(0) {
            return Err(ConfigError::out_of_range("limit", 0, "1.."));
        }
        Ok(())
    }

    /// Where merged records are written.
    #[must_use]
    pub fn results_path(&self) -> PathBuf {
        self.output_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(RESULTS_FILE))
    }

    /// Retry policy: `retry_attempts` retries starting at the rate-limit
    /// delay (never below [`DEFAULT_BASE_DELAY`]) and growing by
    /// `retry_backoff`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            self.rate_limit_delay.max(DEFAULT_BASE_DELAY),
            DEFAULT_MAX_BACKOFF,
            self.retry_backoff,
        )
        .with_jitter(self.retry_jitter)
    }

    /// Builds the paced, retrying HTTP client for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    pub fn build_client(&self) -> Result<ApiClient, FetchError> {
        ApiClient::new(
            RequestPacer::new(self.rate_limit_delay),
            self.retry_policy(),
            self.request_timeout,
        )
    }
}

fn validate_delay_secs(value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=MAX_RATE_LIMIT_DELAY_SECS).contains(&value) {
        return Err(ConfigError::out_of_range("rate_limit_delay", value, "0..=60"));
    }
    Ok(())
}

fn validate_retry_attempts(value: u32) -> Result<(), ConfigError> {
    if value > MAX_RETRY_ATTEMPTS {
        return Err(ConfigError::out_of_range("retry_attempts", value, "0..=10"));
    }
    Ok(())
}

fn validate_backoff(value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(1.0..=MAX_RETRY_BACKOFF).contains(&value) {
        return Err(ConfigError::out_of_range("retry_backoff", value, "1..=10"));
    }
    Ok(())
}

fn validate_checkpoint_interval(value: usize) -> Result<(), ConfigError> {
    if !(1..=MAX_CHECKPOINT_INTERVAL).contains(&value) {
        return Err(ConfigError::out_of_range(
            "checkpoint_interval",
            value,
            "1..=10000",
        ));
    }
    Ok(())
}

// ==================== FileConfig ====================

/// JSON config file contents. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listing_api_url: Option<String>,
    pub details_api_url: Option<String>,
    pub cin_api_url: Option<String>,
    /// Single state id; used when `states` is absent.
    pub state_id: Option<String>,
    pub states: Option<Vec<String>>,
    /// Ignore `states`/`state_id` and search every state.
    pub scrape_all_states: Option<bool>,
    /// Seconds between requests.
    pub rate_limit_delay: Option<f64>,
    pub retry_attempts: Option<u32>,
    pub retry_backoff: Option<f64>,
    pub retry_jitter_ms: Option<u64>,
    pub checkpoint_interval: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

impl FileConfig {
    /// Parses a config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file cannot be read, [`ConfigError::Parse`]
    /// for malformed JSON or unknown keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(path, &raw)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Like [`Self::load`], but a missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`] for a file that exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Overlays the keys present in this file onto `config`.
    ///
    /// # Errors
    ///
    /// Returns an error for values that cannot be represented (bad state ids,
    /// negative or non-finite delays).
    pub fn apply(&self, config: &mut PipelineConfig) -> Result<(), ConfigError> {
        if let Some(url) = &self.listing_api_url {
            config.endpoints.listing.clone_from(url);
        }
        if let Some(url) = &self.details_api_url {
            config.endpoints.details.clone_from(url);
        }
        if let Some(url) = &self.cin_api_url {
            config.endpoints.cin.clone_from(url);
        }

        if self.scrape_all_states == Some(true) {
            config.states = StateFilter::All;
        } else if let Some(states) = &self.states {
            config.states = StateFilter::from_ids(states)?;
        } else if let Some(state) = &self.state_id {
            config.states = StateFilter::from_ids([state])?;
        }

        if let Some(secs) = self.rate_limit_delay {
            validate_delay_secs(secs)?;
            config.rate_limit_delay = Duration::from_secs_f64(secs);
        }
        if let Some(attempts) = self.retry_attempts {
            config.retry_attempts = attempts;
        }
        if let Some(backoff) = self.retry_backoff {
            config.retry_backoff = backoff;
        }
        if let Some(ms) = self.retry_jitter_ms {
            config.retry_jitter = Duration::from_millis(ms);
        }
        if let Some(interval) = self.checkpoint_interval {
            config.checkpoint_interval = interval;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if let Some(file) = &self.output_file {
            config.output_file = Some(file.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OTHER_STATE: &str = "5f48ce592a9bb065cdf9fb26";

    // ==================== StateFilter Tests ====================

    #[test]
    fn test_state_filter_accepts_hex_ids() {
        let filter = StateFilter::from_ids([DEFAULT_STATE_ID, OTHER_STATE]).unwrap();
        assert_eq!(
            filter.payload_states(),
            vec![DEFAULT_STATE_ID.to_string(), OTHER_STATE.to_string()]
        );
    }

    #[test]
    fn test_state_filter_all_means_empty_payload() {
        let filter = StateFilter::from_ids(["ALL"]).unwrap();
        assert_eq!(filter, StateFilter::All);
        assert!(filter.payload_states().is_empty());
        assert_eq!(filter.label(), "all");
    }

    #[test]
    fn test_state_filter_rejects_bad_ids() {
        for bad in ["chhattisgarh", "5f48ce592a9bb065cdf9fb2", "zz48ce592a9bb065cdf9fb25"] {
            assert!(
                matches!(
                    StateFilter::from_ids([bad]),
                    Err(ConfigError::InvalidStateId { .. })
                ),
                "{bad} accepted"
            );
        }
        assert!(StateFilter::from_ids(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_state_filter_dedups() {
        let filter = StateFilter::from_ids([DEFAULT_STATE_ID, DEFAULT_STATE_ID]).unwrap();
        assert_eq!(filter.payload_states().len(), 1);
    }

    // ==================== PipelineConfig Tests ====================

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.rate_limit_delay, Duration::from_millis(500));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.checkpoint_interval, 50);
        assert_eq!(config.results_path(), PathBuf::from(".").join(RESULTS_FILE));
    }

    #[test]
    fn test_retry_policy_uses_rate_limit_delay_as_base() {
        let policy = PipelineConfig::default().retry_policy();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_policy_keeps_backoff_when_pacing_disabled() {
        let policy = PipelineConfig {
            rate_limit_delay: Duration::ZERO,
            retry_backoff: 3.0,
            ..PipelineConfig::default()
        }
        .retry_policy();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(1500));
    }

    #[test]
    fn test_retry_policy_slow_pacing_raises_backoff_base() {
        let policy = PipelineConfig {
            rate_limit_delay: Duration::from_secs(2),
            ..PipelineConfig::default()
        }
        .retry_policy();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = PipelineConfig {
            retry_attempts: 11,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "retry_attempts", .. })
        ));

        config.retry_attempts = 3;
        config.checkpoint_interval = 0;
        assert!(config.validate().is_err());

        config.checkpoint_interval = 10;
        config.retry_backoff = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = PipelineConfig::default();
        config.endpoints.cin = "ftp://example.com/cin".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { field: "cin_api_url", .. })
        ));
    }

    #[test]
    fn test_endpoints_with_base() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:9999/");
        assert_eq!(endpoints.listing, "http://127.0.0.1:9999/search/profiles");
        assert_eq!(endpoints.details, "http://127.0.0.1:9999/profile/");
        assert_eq!(endpoints.cin, "http://127.0.0.1:9999/cin/info");
    }

    // ==================== FileConfig Tests ====================

    #[test]
    fn test_file_config_overlays_present_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"rate_limit_delay": 1.5, "retry_attempts": 5, "states": ["5f48ce592a9bb065cdf9fb26"], "checkpoint_interval": 10}"#,
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        let mut config = PipelineConfig::default();
        file.apply(&mut config).unwrap();

        assert_eq!(config.rate_limit_delay, Duration::from_millis(1500));
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.checkpoint_interval, 10);
        assert_eq!(config.states, StateFilter::States(vec![OTHER_STATE.into()]));
        assert_eq!(config.retry_backoff, DEFAULT_RETRY_BACKOFF);
    }

    #[test]
    fn test_file_config_scrape_all_states_wins() {
        let file = FileConfig {
            scrape_all_states: Some(true),
            states: Some(vec![OTHER_STATE.into()]),
            ..FileConfig::default()
        };
        let mut config = PipelineConfig::default();
        file.apply(&mut config).unwrap();
        assert_eq!(config.states, StateFilter::All);
    }

    #[test]
    fn test_file_config_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"rate_limit": 1}"#).unwrap();
        assert!(matches!(
            FileConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_file_config_negative_delay_rejected() {
        let file = FileConfig {
            rate_limit_delay: Some(-1.0),
            ..FileConfig::default()
        };
        assert!(file.apply(&mut PipelineConfig::default()).is_err());
    }

    #[test]
    fn test_load_optional_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(
            FileConfig::load_optional(&dir.path().join("config.json"))
                .unwrap()
                .is_none()
        );
    }
}
