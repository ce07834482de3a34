//! End-of-run statistics.

use std::time::Duration;

use crate::checkpoint::{Phase, SkippedItem};

/// Counters for one invocation of [`super::PhaseRunner::run`].
///
/// Per-phase counters cover this invocation only; `records_*` totals and
/// `failures` describe the whole dataset as persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Phase the checkpoint was left in.
    pub final_phase: Phase,
    /// The checkpoint was already DONE; nothing ran.
    pub already_complete: bool,
    /// Stopped early because the item budget ran out.
    pub paused: bool,

    pub pages_fetched: usize,
    pub pages_failed: usize,
    /// Ids newly added to the id list.
    pub ids_discovered: usize,
    pub ids_total: usize,

    pub details_fetched: usize,
    pub details_skipped: usize,

    pub contacts_fetched: usize,
    /// Lookups that returned no usable data.
    pub contacts_empty: usize,
    /// Records with a missing or malformed CIN (no lookup made).
    pub contacts_no_cin: usize,
    pub contacts_failed: usize,

    /// Records appended by this invocation.
    pub records_written: usize,
    pub records_total: usize,
    pub records_with_cin: usize,
    pub records_with_email: usize,

    pub requests: u64,
    pub retries: usize,
    pub pacing_delay: Duration,
    pub elapsed: Duration,

    /// Every skipped item recorded in the checkpoint.
    pub failures: Vec<SkippedItem>,
}

impl RunSummary {
    /// True when the pipeline reached DONE.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.final_phase == Phase::Done
    }

    /// True when any item has been skipped.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Elapsed time in minutes, as shown in the final report.
    #[must_use]
    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_summary_is_incomplete_without_failures() {
        let summary = RunSummary::default();
        assert!(!summary.is_complete());
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_elapsed_minutes() {
        let summary = RunSummary {
            elapsed: Duration::from_secs(90),
            ..RunSummary::default()
        };
        assert!((summary.elapsed_minutes() - 1.5).abs() < f64::EPSILON);
    }
}
