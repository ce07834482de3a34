//! Progress callbacks for front-ends.

use crate::checkpoint::Phase;

/// Receives progress events from the runner.
///
/// All methods default to no-ops. Events are delivered from the runner's
/// task, one at a time.
pub trait ProgressObserver: Send + Sync {
    /// A phase is starting (or resuming) with `done` of `total` items
    /// already behind it. `total` is `None` while listing an unknown page count.
    fn phase_started(&self, _phase: Phase, _done: usize, _total: Option<usize>) {}

    /// One item (page, profile, contact lookup) was processed.
    fn item_finished(&self, _phase: Phase, _key: &str) {}

    /// The phase ran out of work.
    fn phase_finished(&self, _phase: Phase) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}
