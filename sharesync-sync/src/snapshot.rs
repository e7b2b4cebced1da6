//! Snapshot of the working copy taken before destructive steps.
//!
//! A [`Snapshot`] is a scoped guard. Every exit path ends in exactly one of:
//!
//! - [`Snapshot::release`]: success; the copy stays on disk and is not used again.
//! - [`Snapshot::discard`]: success with explicit cleanup; the copy is deleted.
//! - [`Snapshot::restore`]: failure; the working copy is replaced by the copy.
//!
//! A guard dropped without any of these (a panic mid-run) restores best-effort.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sharesync_core::paths;

use crate::error::SyncError;
use crate::tree::{copy_tree, remove_path};

/// A live full copy of a directory tree.
#[derive(Debug)]
pub struct Snapshot {
    original: PathBuf,
    path: PathBuf,
    armed: bool,
}

impl Snapshot {
    /// Copy `original` to `<original>_backup_<unix millis now>`.
    ///
    /// The caller must not start destructive steps if this fails.
    pub fn create(original: &Path) -> Result<Self, SyncError> {
        Self::create_at(original, Utc::now().timestamp_millis())
    }

    /// [`Snapshot::create`] with an explicit timestamp.
    pub fn create_at(original: &Path, unix_millis: i64) -> Result<Self, SyncError> {
        let path = paths::snapshot_path(original, unix_millis);
        if path.symlink_metadata().is_ok() {
            return Err(SyncError::BackupFailed {
                path,
                source: std::io::Error::from(std::io::ErrorKind::AlreadyExists),
            });
        }
        if !original.is_dir() {
            return Err(SyncError::BackupFailed {
                path: original.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        if let Err(e) = copy_tree(original, &path) {
            if let Err(cleanup) = remove_path(&path) {
                tracing::warn!(
                    "could not remove partial snapshot {}: {cleanup}",
                    path.display()
                );
            }
            return Err(SyncError::BackupFailed {
                path: e.path,
                source: e.source,
            });
        }

        tracing::info!("snapshot created: {}", path.display());
        Ok(Self {
            original: original.to_path_buf(),
            path,
            armed: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Delete whatever is at the original path and move the snapshot there.
    pub fn restore(mut self) -> Result<(), SyncError> {
        self.armed = false;
        restore_paths(&self.original, &self.path)
    }

    /// Keep the snapshot on disk and stop guarding it. Returns its path.
    pub fn release(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Delete the snapshot.
    pub fn discard(mut self) -> Result<(), SyncError> {
        self.armed = false;
        std::fs::remove_dir_all(&self.path).map_err(|source| SyncError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!("snapshot removed: {}", self.path.display());
        Ok(())
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(
            "snapshot {} dropped while armed; restoring {}",
            self.path.display(),
            self.original.display()
        );
        if let Err(e) = restore_paths(&self.original, &self.path) {
            tracing::error!("restore on drop failed: {e}");
        }
    }
}

fn restore_paths(original: &Path, snapshot: &Path) -> Result<(), SyncError> {
    let failed = |source| SyncError::RollbackFailed {
        snapshot: snapshot.to_path_buf(),
        source,
    };
    if snapshot.symlink_metadata().is_err() {
        return Err(failed(std::io::Error::from(std::io::ErrorKind::NotFound)));
    }
    remove_path(original).map_err(failed)?;
    std::fs::rename(snapshot, original).map_err(failed)?;
    tracing::info!("restored {} from {}", original.display(), snapshot.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
