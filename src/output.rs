//! CLI output formatting for run summaries and status.

use std::path::Path;

use harvester_core::{Phase, RunSummary, SkippedItem};

/// Skipped items listed individually before collapsing to a count.
const MAX_LISTED_FAILURES: usize = 10;

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub(crate) fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub(crate) fn truncate_to_width(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// Final report lines for a run.
pub(crate) fn summary_lines(summary: &RunSummary, results_path: &Path, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    let headline = if summary.already_complete {
        "Pipeline already complete; nothing to do."
    } else if summary.paused {
        "Item limit reached; run again to continue."
    } else if summary.is_complete() {
        "Harvest complete."
    } else {
        "Run stopped before completion."
    };
    lines.push(headline.to_string());

    if !summary.already_complete {
        lines.push(format!(
            "  listing: {} pages ({} failed), {} new ids",
            summary.pages_fetched, summary.pages_failed, summary.ids_discovered
        ));
        lines.push(format!(
            "  details: {} fetched, {} skipped",
            summary.details_fetched, summary.details_skipped
        ));
        lines.push(format!(
            "  contacts: {} found, {} empty, {} without CIN, {} failed",
            summary.contacts_fetched,
            summary.contacts_empty,
            summary.contacts_no_cin,
            summary.contacts_failed
        ));
        lines.push(format!(
            "  requests: {} ({} retries, {:.1}s pacing)",
            summary.requests,
            summary.retries,
            summary.pacing_delay.as_secs_f64()
        ));
    }

    lines.push(format!(
        "Records: {} total ({} written this run), {} with CIN, {} with contact email",
        summary.records_total,
        summary.records_written,
        summary.records_with_cin,
        summary.records_with_email
    ));
    lines.push(format!("Phase: {}", phase_label(summary.final_phase)));
    lines.push(format!("Output: {}", results_path.display()));
    lines.push(format!("Elapsed: {:.2} minutes", summary.elapsed_minutes()));

    if summary.has_failures() {
        lines.push(format!("Skipped items: {}", summary.failures.len()));
        lines.extend(failure_lines(&summary.failures, width));
    }
    lines
}

pub(crate) fn failure_lines(failures: &[SkippedItem], width: usize) -> Vec<String> {
    let mut lines: Vec<String> = failures
        .iter()
        .take(MAX_LISTED_FAILURES)
        .map(|item| {
            truncate_to_width(
                &format!("  [{}] {}: {}", item.phase, item.key, item.reason),
                width,
            )
        })
        .collect();
    if failures.len() > MAX_LISTED_FAILURES {
        lines.push(format!(
            "  ... and {} more (see progress.json)",
            failures.len() - MAX_LISTED_FAILURES
        ));
    }
    lines
}

pub(crate) fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Listing => "LISTING",
        Phase::Detail => "DETAIL",
        Phase::Contact => "CONTACT",
        Phase::Done => "DONE",
    }
}

/// Prints the final report to stdout.
pub(crate) fn print_summary(summary: &RunSummary, results_path: &Path) {
    for line in summary_lines(summary, results_path, terminal_width()) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("abc", 5), "abc");
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
        assert_eq!(truncate_to_width("abcdef", 0), "");
    }

    #[test]
    fn test_summary_lines_complete_run() {
        let summary = RunSummary {
            final_phase: Phase::Done,
            records_total: 3,
            records_written: 3,
            records_with_cin: 2,
            records_with_email: 1,
            elapsed: Duration::from_secs(30),
            ..RunSummary::default()
        };
        let lines = summary_lines(&summary, Path::new("out.json"), 80);
        assert_eq!(lines[0], "Harvest complete.");
        assert!(lines.iter().any(|l| l.contains("3 total") && l.contains("1 with contact email")));
        assert!(lines.iter().any(|l| l == "Phase: DONE"));
        assert!(lines.iter().any(|l| l == "Elapsed: 0.50 minutes"));
        assert!(!lines.iter().any(|l| l.starts_with("Skipped")));
    }

    #[test]
    fn test_summary_lines_list_failures_with_cap() {
        let failures = (0..12)
            .map(|i| SkippedItem {
                phase: Phase::Detail,
                key: format!("id{i}"),
                reason: "HTTP 404".into(),
            })
            .collect();
        let summary = RunSummary {
            failures,
            ..RunSummary::default()
        };
        let lines = summary_lines(&summary, Path::new("out.json"), 80);
        assert!(lines.iter().any(|l| l == "Skipped items: 12"));
        assert!(lines.iter().any(|l| l == "  [detail] id0: HTTP 404"));
        assert!(lines.iter().any(|l| l.contains("and 2 more")));
    }

    #[test]
    fn test_already_complete_headline() {
        let summary = RunSummary {
            already_complete: true,
            final_phase: Phase::Done,
            ..RunSummary::default()
        };
        let lines = summary_lines(&summary, Path::new("out.json"), 80);
        assert!(lines[0].contains("already complete"));
        assert!(!lines.iter().any(|l| l.contains("listing:")));
    }
}
