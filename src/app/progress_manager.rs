//! Progress bar rendering for pipeline runs.

use harvester_core::{Phase, ProgressObserver};
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner} {msg:<8} [{bar:30}] {pos}/{len} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner} {msg:<8} {pos} pages";

/// [`ProgressObserver`] drawing an `indicatif` bar, or nothing when disabled.
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            bar: enabled.then(|| ProgressBar::new(0)),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ProgressObserver for ProgressReporter {
    fn phase_started(&self, phase: Phase, done: usize, total: Option<usize>) {
        let Some(bar) = &self.bar else {
            return;
        };
        let template = if total.is_some() {
            BAR_TEMPLATE
        } else {
            SPINNER_TEMPLATE
        };
        bar.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_length(total.map_or(0, to_u64));
        bar.set_position(to_u64(done));
        bar.set_message(phase.as_str());
    }

    fn item_finished(&self, _phase: Phase, _key: &str) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn phase_finished(&self, phase: Phase) {
        if let Some(bar) = &self.bar {
            bar.println(format!("{phase} phase complete"));
        }
    }
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
