//! The phase runner.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use super::{PipelineError, ProgressObserver, RunSummary};
use crate::api::StartupSource;
use crate::checkpoint::{CheckpointStore, Phase, ProgressState};
use crate::config::PipelineConfig;
use crate::record::{
    ContactInfo, MergedRecord, StartupDetail, StartupRef, is_valid_cin, merge, normalize_cin,
};

/// Listing stops after this many failed pages in a row.
pub const MAX_CONSECUTIVE_PAGE_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseOutcome {
    Finished,
    Paused,
}

/// Per-invocation item budget (`--limit`).
#[derive(Debug, Clone, Copy)]
struct ItemBudget {
    remaining: Option<usize>,
}

impl ItemBudget {
    fn new(limit: Option<usize>) -> Self {
        Self { remaining: limit }
    }

    fn exhausted(self) -> bool {
        self.remaining == Some(0)
    }

    fn consume(&mut self) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

/// Drives the pipeline from wherever the checkpoint left it.
///
/// Requests are issued strictly one at a time. Every
/// `checkpoint_interval` items the accumulated collection is flushed,
/// followed by the progress file, so an interruption loses at most that
/// many items of work and never duplicates a record.
///
/// # Example
///
/// ```no_run
/// use harvester_core::{CheckpointStore, NoopObserver, PhaseRunner, PipelineConfig, StartupIndiaApi};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::default();
/// let api = StartupIndiaApi::new(config.build_client()?, config.endpoints.clone());
/// let store = CheckpointStore::open(&config.data_dir)?.with_results_path(config.results_path());
/// let runner = PhaseRunner::new(config, Box::new(api), store);
/// let summary = runner.run(&NoopObserver).await?;
/// println!("{} records", summary.records_total);
/// # Ok(())
/// # }
/// ```
pub struct PhaseRunner {
    config: PipelineConfig,
    source: Box<dyn StartupSource>,
    store: CheckpointStore,
}

impl std::fmt::Debug for PhaseRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseRunner")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl PhaseRunner {
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn StartupSource>,
        store: CheckpointStore,
    ) -> Self {
        Self {
            config,
            source,
            store,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Runs phases until DONE or until the item budget is spent.
    ///
    /// Re-running a completed pipeline is a no-op that reports the existing
    /// dataset.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] before any request when the configuration is
    /// invalid; [`PipelineError::Checkpoint`] when persistence fails. Per-item
    /// fetch or data failures never surface here.
    #[instrument(skip_all, fields(states = %self.config.states.label()))]
    pub async fn run(&self, observer: &dyn ProgressObserver) -> Result<RunSummary, PipelineError> {
        self.config.validate()?;

        let started = Instant::now();
        let mut state = self.store.load_or_init()?;
        let mut summary = RunSummary::default();
        let mut budget = ItemBudget::new(self.config.limit);

        if state.is_done() {
            info!("pipeline already complete, nothing to do");
            summary.already_complete = true;
        } else {
            info!(phase = %state.phase, cursor = state.cursor, "starting run");
        }

        while !state.is_done() {
            let outcome = match state.phase {
                Phase::Listing => self.run_listing(&mut state, &mut summary, observer).await?,
                Phase::Detail => {
                    self.run_detail(&mut state, &mut summary, &mut budget, observer)
                        .await?
                }
                Phase::Contact => {
                    self.run_contact(&mut state, &mut summary, &mut budget, observer)
                        .await?
                }
                Phase::Done => PhaseOutcome::Finished,
            };
            if outcome == PhaseOutcome::Paused {
                info!(phase = %state.phase, cursor = state.cursor, "item limit reached, pausing");
                summary.paused = true;
                break;
            }
        }

        self.finish(state, summary, started)
    }

    // ==================== LISTING ====================

    async fn run_listing(
        &self,
        state: &mut ProgressState,
        summary: &mut RunSummary,
        observer: &dyn ProgressObserver,
    ) -> Result<PhaseOutcome, PipelineError> {
        observer.phase_started(
            Phase::Listing,
            state.cursor,
            state.total_pages.and_then(|n| usize::try_from(n).ok()),
        );
        let mut consecutive_failures = 0;

        while let Ok(page) = u32::try_from(state.cursor) {
            if state.total_pages.is_some_and(|total| page >= total) {
                info!(page, "reported page count reached, listing complete");
                break;
            }

            match self.source.list_page(page, &self.config.states).await {
                Ok(listing) => {
                    consecutive_failures = 0;
                    summary.pages_fetched += 1;
                    if listing.total_pages.is_some() {
                        state.total_pages = listing.total_pages;
                    }
                    if listing.is_empty() {
                        info!(page, "empty listing page, listing complete");
                        break;
                    }
                    let found = listing.refs.len();
                    let added = self.store.append_ids(listing.refs)?;
                    summary.ids_discovered += added;
                    info!(page, found, added, "listing page processed");
                }
                Err(error) => {
                    consecutive_failures += 1;
                    summary.pages_failed += 1;
                    warn!(page, %error, "listing page failed, skipping");
                    state.record_failure(page.to_string(), error.to_string());
                }
            }

            let key = page.to_string();
            state.cursor += 1;
            state.last_key = Some(key.clone());
            self.store.save(state)?;
            observer.item_finished(Phase::Listing, &key);

            if consecutive_failures >= MAX_CONSECUTIVE_PAGE_FAILURES {
                warn!(
                    failures = consecutive_failures,
                    "too many consecutive listing failures, ending listing"
                );
                break;
            }
        }

        let ids = self.store.load_ids()?.len();
        summary.ids_total = ids;
        self.complete_phase(state, ids, observer)?;
        Ok(PhaseOutcome::Finished)
    }

    // ==================== DETAIL ====================

    async fn run_detail(
        &self,
        state: &mut ProgressState,
        summary: &mut RunSummary,
        budget: &mut ItemBudget,
        observer: &dyn ProgressObserver,
    ) -> Result<PhaseOutcome, PipelineError> {
        let ids = self.store.load_ids()?;
        let mut details = self.store.load_details()?;
        let mut staged: HashSet<String> = details.iter().map(|d| d.id.clone()).collect();

        state.total = ids.len();
        observer.phase_started(Phase::Detail, state.cursor, Some(ids.len()));
        let mut pending = 0;

        while let Some(item) = ids.get(state.cursor) {
            if budget.exhausted() {
                self.flush_details(&details, state)?;
                return Ok(PhaseOutcome::Paused);
            }

            if staged.contains(&item.id) {
                debug!(id = %item.id, "profile already staged");
            } else {
                match self.fetch_detail(item).await {
                    Ok(detail) => {
                        staged.insert(detail.id.clone());
                        details.push(detail);
                        summary.details_fetched += 1;
                    }
                    Err(reason) => {
                        warn!(id = %item.id, name = item.label(), %reason, "skipping profile");
                        state.record_failure(item.id.clone(), reason);
                        summary.details_skipped += 1;
                    }
                }
                budget.consume();
                pending += 1;
            }

            state.cursor += 1;
            state.last_key = Some(item.id.clone());
            observer.item_finished(Phase::Detail, &item.id);

            if pending >= self.config.checkpoint_interval {
                self.flush_details(&details, state)?;
                pending = 0;
            }
        }

        self.flush_details(&details, state)?;
        self.complete_phase(state, details.len(), observer)?;
        Ok(PhaseOutcome::Finished)
    }

    async fn fetch_detail(&self, item: &StartupRef) -> Result<StartupDetail, String> {
        let body = self
            .source
            .fetch_detail(&item.id)
            .await
            .map_err(|e| e.to_string())?;
        StartupDetail::from_profile(&item.id, &body).map_err(|e| e.to_string())
    }

    fn flush_details(
        &self,
        details: &[StartupDetail],
        state: &mut ProgressState,
    ) -> Result<(), PipelineError> {
        self.store.save_details(details)?;
        self.store.save(state)?;
        debug!(staged = details.len(), cursor = state.cursor, "detail checkpoint flushed");
        Ok(())
    }

    // ==================== CONTACT ====================

    async fn run_contact(
        &self,
        state: &mut ProgressState,
        summary: &mut RunSummary,
        budget: &mut ItemBudget,
        observer: &dyn ProgressObserver,
    ) -> Result<PhaseOutcome, PipelineError> {
        let details = self.store.load_details()?;
        let mut results = self.store.load_results()?;
        let mut written: HashSet<String> = results.iter().map(|r| r.id().to_string()).collect();

        state.total = details.len();
        observer.phase_started(Phase::Contact, state.cursor, Some(details.len()));
        let mut pending = 0;

        while let Some(detail) = details.get(state.cursor) {
            if budget.exhausted() {
                self.flush_results(&results, state)?;
                return Ok(PhaseOutcome::Paused);
            }

            if written.contains(&detail.id) {
                debug!(id = %detail.id, "record already written");
            } else {
                let contact = self.lookup_contact(detail, state, summary).await;
                written.insert(detail.id.clone());
                results.push(merge(detail.clone(), contact));
                summary.records_written += 1;
                budget.consume();
                pending += 1;
            }

            state.cursor += 1;
            state.last_key = Some(detail.id.clone());
            observer.item_finished(Phase::Contact, &detail.id);

            if pending >= self.config.checkpoint_interval {
                self.flush_results(&results, state)?;
                pending = 0;
            }
        }

        self.flush_results(&results, state)?;
        self.complete_phase(state, results.len(), observer)?;
        Ok(PhaseOutcome::Finished)
    }

    /// Looks up contact data; a missing or malformed CIN makes no request.
    async fn lookup_contact(
        &self,
        detail: &StartupDetail,
        state: &mut ProgressState,
        summary: &mut RunSummary,
    ) -> Option<ContactInfo> {
        let Some(cin) = detail
            .cin
            .as_deref()
            .filter(|cin| is_valid_cin(cin))
            .and_then(normalize_cin)
        else {
            debug!(id = %detail.id, cin = ?detail.cin, "no usable CIN, skipping contact lookup");
            summary.contacts_no_cin += 1;
            return None;
        };

        match self.source.fetch_contact(&cin).await {
            Ok(Some(info)) => {
                summary.contacts_fetched += 1;
                Some(info)
            }
            Ok(None) => {
                debug!(id = %detail.id, %cin, "registry returned no contact data");
                summary.contacts_empty += 1;
                None
            }
            Err(error) => {
                warn!(id = %detail.id, %cin, %error, "contact lookup failed, writing record without contact");
                state.record_failure(detail.id.clone(), error.to_string());
                summary.contacts_failed += 1;
                None
            }
        }
    }

    fn flush_results(
        &self,
        results: &[MergedRecord],
        state: &mut ProgressState,
    ) -> Result<(), PipelineError> {
        self.store.save_results(results)?;
        self.store.save(state)?;
        debug!(records = results.len(), cursor = state.cursor, "result checkpoint flushed");
        Ok(())
    }

    // ==================== Transitions ====================

    fn complete_phase(
        &self,
        state: &mut ProgressState,
        next_total: usize,
        observer: &dyn ProgressObserver,
    ) -> Result<(), PipelineError> {
        let finished = state.phase;
        state.advance(next_total);
        self.store.save(state)?;
        observer.phase_finished(finished);
        info!(from = %finished, to = %state.phase, total = next_total, "phase complete");
        Ok(())
    }

    fn finish(
        &self,
        state: ProgressState,
        mut summary: RunSummary,
        started: Instant,
    ) -> Result<RunSummary, PipelineError> {
        let results = self.store.load_results()?;
        summary.final_phase = state.phase;
        summary.ids_total = self.store.load_ids()?.len();
        summary.records_total = results.len();
        summary.records_with_cin = results
            .iter()
            .filter(|r| r.detail.cin.as_deref().is_some_and(is_valid_cin))
            .count();
        summary.records_with_email = results.iter().filter(|r| r.has_email()).count();

        let stats = self.source.stats();
        summary.requests = stats.requests;
        summary.retries = stats.retries;
        summary.pacing_delay = stats.pacing_delay;
        summary.elapsed = started.elapsed();
        summary.failures = state.failures;

        info!(
            phase = %summary.final_phase,
            records = summary.records_total,
            written = summary.records_written,
            skipped = summary.failures.len(),
            retries = summary.retries,
            "run finished"
        );
        Ok(summary)
    }
}
