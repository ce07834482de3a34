//! Pipeline phase and persisted progress.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Pipeline phase. Transitions only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Paging through the listing endpoint collecting ids.
    #[default]
    Listing,
    /// Fetching one profile per collected id.
    Detail,
    /// Looking up registry contact data per staged profile.
    Contact,
    /// Terminal.
    Done,
}

impl Phase {
    /// The phase that follows this one; `Done` stays `Done`.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Listing => Self::Detail,
            Self::Detail => Self::Contact,
            Self::Contact | Self::Done => Self::Done,
        }
    }

    /// Lowercase name for logs and the progress bar.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Detail => "detail",
            Self::Contact => "contact",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item that was skipped after exhausting retries or failing validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub phase: Phase,
    /// Page number (listing) or startup id (detail, contact).
    pub key: String,
    pub reason: String,
}

/// Durable position of the pipeline, written to `progress.json`.
///
/// `cursor` is phase-relative: the next page number while listing, an index
/// into the id list while fetching details, an index into the staged
/// details while looking up contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub phase: Phase,
    pub cursor: usize,
    /// Size of the current phase's work set, when known.
    #[serde(default)]
    pub total: usize,
    /// Key of the last item processed.
    #[serde(default)]
    pub last_key: Option<String>,
    /// Unix seconds of the last save.
    #[serde(default)]
    pub updated_at: u64,
    /// Page count reported by the listing endpoint, once seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub failures: Vec<SkippedItem>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    /// Fresh state: listing from page 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Listing,
            cursor: 0,
            total: 0,
            last_key: None,
            updated_at: 0,
            total_pages: None,
            failures: Vec::new(),
        }
    }

    /// True once the pipeline has reached its terminal phase.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Moves to the next phase with the cursor reset.
    pub fn advance(&mut self, total: usize) {
        self.phase = self.phase.next();
        self.cursor = 0;
        self.total = total;
    }

    /// Appends a skipped item for the current phase.
    pub fn record_failure(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.failures.push(SkippedItem {
            phase: self.phase,
            key: key.into(),
            reason: reason.into(),
        });
    }

    /// Number of recorded failures in `phase`.
    #[must_use]
    pub fn failures_in(&self, phase: Phase) -> usize {
        self.failures.iter().filter(|f| f.phase == phase).count()
    }

    /// Stamps `updated_at` with the current wall clock.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
    }
}
