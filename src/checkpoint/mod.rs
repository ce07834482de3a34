//! Durable pipeline state.
//!
//! [`CheckpointStore`] owns a data directory holding:
//!
//! - `checkpoint_ids.json` - ids discovered by the listing phase
//! - `details.json` - profiles staged by the detail phase
//! - `progress.json` - the [`ProgressState`]
//! - `.harvester.lock` - advisory lock file
//!
//! plus the result collection (default `startups_data.json`, relocatable).
//! All writes go through an atomic temp-then-rename so an interrupted
//! process leaves either the old or the new version of each file.

mod error;
mod fs_safe;
mod ids;
mod state;

pub use error::CheckpointError;
pub use ids::IdSet;
pub use state::{Phase, ProgressState, SkippedItem};

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::record::{MergedRecord, StartupDetail, StartupRef};
use fs_safe::{DirLock, atomic_write_json, read_json, remove_if_exists};

/// Id list file name.
pub const IDS_FILE: &str = "checkpoint_ids.json";
/// Staged detail file name.
pub const DETAILS_FILE: &str = "details.json";
/// Progress file name.
pub const PROGRESS_FILE: &str = "progress.json";
/// Default result file name.
pub const RESULTS_FILE: &str = "startups_data.json";
const LOCK_FILE: &str = ".harvester.lock";

/// File-backed checkpoint and result store for one data directory.
#[derive(Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
    results_path: PathBuf,
    lock_path: PathBuf,
    lock_file: File,
}

impl CheckpointStore {
    /// Opens (creating if needed) the store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the directory or lock file cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CheckpointError::io("create data directory", &dir, e))?;

        let lock_path = dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| CheckpointError::io("open lock file", &lock_path, e))?;

        debug!(dir = %dir.display(), "checkpoint store opened");
        Ok(Self {
            results_path: dir.join(RESULTS_FILE),
            dir,
            lock_path,
            lock_file,
        })
    }

    /// Relocates the result collection.
    #[must_use]
    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = path.into();
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn lock(&self) -> Result<DirLock<'_>, CheckpointError> {
        DirLock::acquire(&self.lock_file, &self.lock_path)
    }

    // ==================== Progress ====================

    /// Loads the saved progress, if any.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::Corrupt`] when `progress.json` exists but does not parse.
    pub fn load(&self) -> Result<Option<ProgressState>, CheckpointError> {
        let _guard = self.lock()?;
        read_json(&self.path(PROGRESS_FILE))
    }

    /// Loads the saved progress or starts fresh at listing page 0.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_or_init(&self) -> Result<ProgressState, CheckpointError> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Persists `state` atomically, stamping its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    #[instrument(level = "debug", skip(self, state), fields(phase = %state.phase, cursor = state.cursor))]
    pub fn save(&self, state: &mut ProgressState) -> Result<(), CheckpointError> {
        state.touch();
        let _guard = self.lock()?;
        atomic_write_json(&self.path(PROGRESS_FILE), "progress", state)
    }

    // ==================== Ids ====================

    /// Loads the discovered id list; empty when none has been written.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::Corrupt`] when the file does not parse.
    pub fn load_ids(&self) -> Result<IdSet, CheckpointError> {
        let _guard = self.lock()?;
        Ok(self.read_ids()?.into_iter().collect())
    }

    fn read_ids(&self) -> Result<Vec<StartupRef>, CheckpointError> {
        Ok(read_json(&self.path(IDS_FILE))?.unwrap_or_default())
    }

    /// Merges `ids` into the stored list, keeping order and dropping
    /// duplicates. Returns how many were new. Nothing is written when
    /// every id was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing list is corrupt or the write fails.
    pub fn append_ids<I>(&self, ids: I) -> Result<usize, CheckpointError>
    where
        I: IntoIterator<Item = StartupRef>,
    {
        let _guard = self.lock()?;
        let mut set: IdSet = self.read_ids()?.into_iter().collect();
        let added = ids.into_iter().filter(|r| set.insert(r.clone())).count();
        if added > 0 {
            atomic_write_json(&self.path(IDS_FILE), "id list", set.as_slice())?;
        }
        debug!(added, total = set.len(), "ids appended");
        Ok(added)
    }

    // ==================== Staged details ====================

    /// Loads profiles staged by the detail phase.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::Corrupt`] when the file does not parse.
    pub fn load_details(&self) -> Result<Vec<StartupDetail>, CheckpointError> {
        let _guard = self.lock()?;
        Ok(read_json(&self.path(DETAILS_FILE))?.unwrap_or_default())
    }

    /// Replaces the staged profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn save_details(&self, details: &[StartupDetail]) -> Result<(), CheckpointError> {
        let _guard = self.lock()?;
        atomic_write_json(&self.path(DETAILS_FILE), "staged details", details)
    }

    // ==================== Results ====================

    /// Loads the merged output collection.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::Corrupt`] when the file does not parse.
    pub fn load_results(&self) -> Result<Vec<MergedRecord>, CheckpointError> {
        let _guard = self.lock()?;
        Ok(read_json(&self.results_path)?.unwrap_or_default())
    }

    /// Replaces the merged output collection.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn save_results(&self, records: &[MergedRecord]) -> Result<(), CheckpointError> {
        let _guard = self.lock()?;
        atomic_write_json(&self.results_path, "results", records)
    }

    /// Removes every checkpoint and result file so the next run starts over.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be removed.
    pub fn reset(&self) -> Result<(), CheckpointError> {
        let _guard = self.lock()?;
        let mut removed = 0;
        for path in [
            self.path(IDS_FILE),
            self.path(DETAILS_FILE),
            self.path(PROGRESS_FILE),
            self.results_path.clone(),
        ] {
            if remove_if_exists(&path)? {
                removed += 1;
            }
        }
        info!(dir = %self.dir.display(), removed, "checkpoint cleared");
        Ok(())
    }
}
