//! Cleanup of snapshots left behind by successful runs.
//!
//! A successful run keeps its snapshot unless `discard_snapshot` is set; these
//! accumulate as `<workspace>/temp/<target>_backup_<unix_millis>` directories.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use sharesync_core::{paths, TargetName};

use crate::error::{io_err, SyncError};

/// A snapshot directory found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    /// Name of the working copy it was taken from.
    pub working_copy: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// List snapshot directories under `temp_root`, oldest first.
///
/// With `target`, only that target's snapshots are listed. A missing
/// `temp_root` yields an empty list.
pub fn find_snapshots(
    temp_root: &Path,
    target: Option<&TargetName>,
) -> Result<Vec<SnapshotEntry>, SyncError> {
    let entries = match std::fs::read_dir(temp_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(io_err(temp_root, e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(temp_root, e))?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name();
        let Some((base, millis)) = file_name.to_str().and_then(paths::parse_snapshot_name) else {
            continue;
        };
        if target.is_some_and(|t| t.as_str() != base) {
            continue;
        }
        found.push((
            millis,
            SnapshotEntry {
                path: entry.path(),
                working_copy: base.to_owned(),
                created_at: Utc.timestamp_millis_opt(millis).single(),
            },
        ));
    }
    found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));
    Ok(found.into_iter().map(|(_, e)| e).collect())
}

/// Delete every snapshot [`find_snapshots`] reports. With `dry_run`, only list them.
pub fn prune_snapshots(
    temp_root: &Path,
    target: Option<&TargetName>,
    dry_run: bool,
) -> Result<Vec<SnapshotEntry>, SyncError> {
    let snapshots = find_snapshots(temp_root, target)?;
    for snapshot in &snapshots {
        if dry_run {
            tracing::info!("[dry-run] would remove {}", snapshot.path.display());
            continue;
        }
        std::fs::remove_dir_all(&snapshot.path).map_err(|e| io_err(&snapshot.path, e))?;
        tracing::info!("removed {}", snapshot.path.display());
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let tmp = TempDir::new().unwrap();
        for dir in ["app", "app_backup_200", "app_backup_100", "web_backup_150", "notes_backup_x"] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        fs::write(tmp.path().join("stray_backup_5"), "file, not dir").unwrap();
        tmp
    }

    #[test]
    fn lists_only_snapshot_dirs_oldest_first() {
        let tmp = layout();
        let found = find_snapshots(tmp.path(), None).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["app_backup_100", "web_backup_150", "app_backup_200"]);
        assert_eq!(found[0].working_copy, "app");
        assert_eq!(found[0].created_at.unwrap().timestamp_millis(), 100);
    }

    #[test]
    fn filters_by_target() {
        let tmp = layout();
        let target: TargetName = "web".parse().unwrap();
        let found = find_snapshots(tmp.path(), Some(&target)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].working_copy, "web");
    }

    #[test]
    fn dry_run_keeps_everything() {
        let tmp = layout();
        let listed = prune_snapshots(tmp.path(), None, true).unwrap();
        assert_eq!(listed.len(), 3);
        assert!(tmp.path().join("app_backup_100").exists());
    }

    #[test]
    fn prune_removes_snapshots_but_not_working_copies() {
        let tmp = layout();
        prune_snapshots(tmp.path(), None, false).unwrap();
        assert!(tmp.path().join("app").is_dir());
        assert!(!tmp.path().join("app_backup_100").exists());
        assert!(!tmp.path().join("web_backup_150").exists());
        assert!(tmp.path().join("notes_backup_x").exists());
        assert!(tmp.path().join("stray_backup_5").exists());
    }

    #[test]
    fn missing_temp_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(find_snapshots(&tmp.path().join("temp"), None).unwrap().is_empty());
    }
}
