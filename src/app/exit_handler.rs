//! Exit code logic for the harvester process.
//!
//! Single responsibility: map a run summary to the process exit outcome.

use harvester_core::RunSummary;

use crate::ProcessExit;

/// Success when nothing was skipped; partial when some records made it;
/// failure when items were skipped and no record was produced.
pub(crate) fn determine_exit_outcome(summary: &RunSummary) -> ProcessExit {
    if !summary.has_failures() {
        ProcessExit::Success
    } else if summary.records_total > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
