//! Error types for checkpoint persistence.
//!
//! Every variant is fatal to a run: continuing without a trustworthy
//! checkpoint would risk duplicated or lost records.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing checkpoint and result files.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// File system error (create, write, rename, lock, fsync).
    #[error("checkpoint IO error during {operation} on {path}: {source}")]
    Io {
        /// What was being done when the error occurred.
        operation: &'static str,
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A file exists under its final name but does not parse.
    #[error("checkpoint file {path} is corrupt: {reason}")]
    Corrupt {
        /// The unreadable file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// In-memory serialization failed before anything touched the disk.
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        /// What was being serialized.
        what: &'static str,
        /// The serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl CheckpointError {
    /// Creates an IO error with operation and path context.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt-file error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_has_operation_and_path() {
        let error = CheckpointError::io(
            "rename",
            "/tmp/progress.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = error.to_string();
        assert!(msg.contains("rename"), "{msg}");
        assert!(msg.contains("/tmp/progress.json"), "{msg}");
    }

    #[test]
    fn test_corrupt_error_display() {
        let error = CheckpointError::corrupt("/tmp/ids.json", "EOF while parsing");
        assert!(error.to_string().contains("corrupt"));
        assert!(error.to_string().contains("EOF"));
    }
}
