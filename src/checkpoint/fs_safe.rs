//! Crash-safe file primitives for the checkpoint store.
//!
//! Writers never touch a file under its final name: data goes to a temp file
//! in the same directory, is fsynced, then renamed over the target. A reader
//! therefore sees either the previous complete file or the new complete file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use super::CheckpointError;

/// Writes `data` to `path` atomically (temp file + fsync + rename + dir fsync).
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<(), CheckpointError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(parent)
        .map_err(|e| CheckpointError::io("create directory", parent, e))?;

    // Same directory, so the final rename never crosses a filesystem.
    let mut tmp = tempfile::Builder::new()
        .prefix(".harvester-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| CheckpointError::io("create temp file", parent, e))?;

    tmp.write_all(data)
        .map_err(|e| CheckpointError::io("write temp file", tmp.path(), e))?;
    tmp.flush()
        .map_err(|e| CheckpointError::io("flush temp file", tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| CheckpointError::io("fsync temp file", tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|e| CheckpointError::io("rename into place", path, e.error))?;

    fsync_directory(parent);
    trace!(path = %path.display(), bytes = data.len(), "atomic write complete");
    Ok(())
}

/// Serializes `value` as pretty JSON in memory, then writes it atomically.
///
/// A serialization failure never leaves anything on disk.
pub(crate) fn atomic_write_json<T: Serialize + ?Sized>(
    path: &Path,
    what: &'static str,
    value: &T,
) -> Result<(), CheckpointError> {
    let mut json = serde_json::to_vec_pretty(value)
        .map_err(|source| CheckpointError::Serialize { what, source })?;
    json.push(b'\n');
    atomic_write(path, &json)
}

/// Reads and parses a JSON file; `Ok(None)` when it does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CheckpointError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CheckpointError::io("read", path, e)),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| CheckpointError::corrupt(path, e.to_string()))
}

/// Removes a file, ignoring "not found".
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool, CheckpointError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CheckpointError::io("remove", path, e)),
    }
}

/// Exclusive advisory lock held for one read-modify-write cycle.
///
/// Released when dropped.
pub(crate) struct DirLock<'a> {
    file: &'a File,
}

impl<'a> DirLock<'a> {
    /// Blocks until the exclusive lock on `file` is acquired.
    pub(crate) fn acquire(file: &'a File, path: &Path) -> Result<Self, CheckpointError> {
        FileExt::lock_exclusive(file).map_err(|e| CheckpointError::io("lock", path, e))?;
        Ok(Self { file })
    }
}

impl Drop for DirLock<'_> {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(self.file) {
            warn!(%error, "failed to release checkpoint lock");
        }
    }
}

#[cfg(unix)]
fn fsync_directory(dir: &Path) {
    // Commits the rename itself; failure only weakens durability, not atomicity.
    if let Err(error) = File::open(dir).and_then(|d| d.sync_all()) {
        warn!(dir = %dir.display(), %error, "failed to fsync checkpoint directory");
    }
}

#[cfg(not(unix))]
fn fsync_directory(_dir: &Path) {}
