//! Status command handler: report checkpoint progress without fetching anything.

use anyhow::{Context, Result};
use harvester_core::{CheckpointStore, PipelineConfig, ProgressState};

use crate::output;

/// Counts read from the data directory.
#[derive(Debug, Clone)]
pub(crate) struct StatusReport {
    pub(crate) progress: Option<ProgressState>,
    pub(crate) ids: usize,
    pub(crate) staged: usize,
    pub(crate) records: usize,
}

pub(crate) fn collect_status(config: &PipelineConfig) -> Result<StatusReport> {
    let store = CheckpointStore::open(&config.data_dir)
        .with_context(|| format!("cannot open data directory {}", config.data_dir.display()))?
        .with_results_path(config.results_path());
    Ok(StatusReport {
        progress: store.load()?,
        ids: store.load_ids()?.len(),
        staged: store.load_details()?.len(),
        records: store.load_results()?.len(),
    })
}

pub(crate) fn status_lines(report: &StatusReport, width: usize) -> Vec<String> {
    let Some(progress) = &report.progress else {
        return vec!["No checkpoint found; the next run starts at LISTING page 0.".to_string()];
    };

    let mut lines = vec![
        format!("phase = {}", output::phase_label(progress.phase)),
        format!("cursor = {}/{}", progress.cursor, progress.total),
        format!(
            "last_key = {}",
            progress.last_key.as_deref().unwrap_or("-")
        ),
        format!("updated_at = {}", progress.updated_at),
        format!("ids = {}", report.ids),
        format!("staged_details = {}", report.staged),
        format!("records = {}", report.records),
        format!("skipped = {}", progress.failures.len()),
    ];
    lines.extend(output::failure_lines(&progress.failures, width));
    lines
}

pub(crate) fn run_status_command(config: &PipelineConfig) -> Result<()> {
    let report = collect_status(config)?;
    for line in status_lines(&report, output::terminal_width()) {
        println!("{line}");
    }
    Ok(())
}
