//! Error types for sharesync-sync.

use std::path::PathBuf;

use thiserror::Error;

use crate::process::CommandError;

/// Every way a sync step can fail.
///
/// Step-level variants name the step; the underlying command or I/O failure
/// is kept as the `#[source]`.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("clone failed: {0}")]
    CloneFailed(#[source] CommandError),

    #[error("backup of {path} failed: {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Destination delete or copy failure while replacing a subtree.
    #[error("subtree sync failed at {path}: {source}")]
    SyncFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("change detection failed: {0}")]
    DetectFailed(#[source] CommandError),

    #[error("dependency install failed: {0}")]
    InstallFailed(#[source] CommandError),

    #[error("commit failed: {0}")]
    CommitFailed(#[source] CommandError),

    #[error("push failed: {0}")]
    PushFailed(#[source] CommandError),

    /// Secondary failure; always reported next to the error that triggered it.
    #[error("rollback to {snapshot} failed: {source}")]
    RollbackFailed {
        snapshot: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
