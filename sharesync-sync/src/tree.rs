//! Subtree replacement.
//!
//! `sync_subtree` is delete-then-copy, not a merge: anything that only existed
//! in the destination's copy of the subtree is gone afterwards.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::SyncError;

/// Outcome of replacing one subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtreeOutcome {
    /// The source has no such subtree; the destination was not touched.
    SkippedMissingSource { source: PathBuf },
    /// The destination subtree now mirrors the source.
    Replaced {
        dest: PathBuf,
        /// Regular files and symlinks copied.
        files: usize,
        /// Whether a previous destination subtree was deleted first.
        replaced_existing: bool,
    },
}

/// Replace `dest_root/name` with a full copy of `source_root/name`.
pub fn sync_subtree(
    source_root: &Path,
    dest_root: &Path,
    name: &str,
) -> Result<SubtreeOutcome, SyncError> {
    let from = source_root.join(name);
    let dest = dest_root.join(name);

    if from.symlink_metadata().is_err() {
        tracing::warn!("'{name}' does not exist in {}; skipping", source_root.display());
        return Ok(SubtreeOutcome::SkippedMissingSource { source: from });
    }

    tracing::info!("syncing '{name}': {} -> {}", from.display(), dest.display());
    let replaced_existing = remove_path(&dest).map_err(|source| SyncError::SyncFailed {
        path: dest.clone(),
        source,
    })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SyncError::SyncFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let files = copy_tree(&from, &dest).map_err(|e| SyncError::SyncFailed {
        path: e.path,
        source: e.source,
    })?;

    tracing::info!("'{name}' synced ({files} files)");
    Ok(SubtreeOutcome::Replaced {
        dest,
        files,
        replaced_existing,
    })
}

/// Apply [`sync_subtree`] for each name, in order, stopping at the first failure.
pub fn sync_subtrees(
    source_root: &Path,
    dest_root: &Path,
    names: &[String],
) -> Result<Vec<SubtreeOutcome>, SyncError> {
    names
        .iter()
        .map(|name| sync_subtree(source_root, dest_root, name))
        .collect()
}

// ---------------------------------------------------------------------------
// Filesystem primitives (shared with the snapshot manager)
// ---------------------------------------------------------------------------

/// An I/O failure at a specific path inside a tree operation.
#[derive(Debug)]
pub(crate) struct TreeError {
    pub path: PathBuf,
    pub source: io::Error,
}

/// Recursively copy `src` (a directory, file or symlink) to `dst`.
///
/// File contents and permissions are copied; symlinks are recreated, not
/// followed. `dst` must not exist. Returns the number of non-directory
/// entries copied.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<usize, TreeError> {
    let mut copied = 0;
    let mut dirs = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| TreeError {
            path: e.path().map_or_else(|| src.to_path_buf(), Path::to_path_buf),
            source: io::Error::from(e),
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = if rel.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(rel)
        };
        let at = |source| TreeError {
            path: target.clone(),
            source,
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir(&target).map_err(at)?;
            dirs.push((entry.path().to_path_buf(), target.clone()));
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(at)?;
            copied += 1;
        } else {
            std::fs::copy(entry.path(), &target).map_err(at)?;
            copied += 1;
        }
    }

    // Directory permissions last, deepest first, so read-only directories
    // do not block their own contents.
    for (from, to) in dirs.into_iter().rev() {
        let perms = std::fs::metadata(&from)
            .map_err(|source| TreeError {
                path: from.clone(),
                source,
            })?
            .permissions();
        std::fs::set_permissions(&to, perms).map_err(|source| TreeError { path: to, source })?;
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    let points_to = std::fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::fs::copy(link, target).map(|_| ())
}

/// Remove whatever is at `path`. Returns `false` if nothing was there.
pub(crate) fn remove_path(path: &Path) -> io::Result<bool> {
    let meta = match path.symlink_metadata() {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else {
        std::fs::remove_file(path)?;
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn replaces_subtree_and_drops_destination_only_files() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("shared/config.json"), "A");
        write(&dst.path().join("shared/config.json"), "B");
        write(&dst.path().join("shared/extra.txt"), "stale");

        let outcome = sync_subtree(src.path(), dst.path(), "shared").unwrap();

        assert_eq!(
            fs::read_to_string(dst.path().join("shared/config.json")).unwrap(),
            "A"
        );
        assert!(!dst.path().join("shared/extra.txt").exists());
        assert!(matches!(
            outcome,
            SubtreeOutcome::Replaced {
                files: 1,
                replaced_existing: true,
                ..
            }
        ));
    }

    #[test]
    fn missing_source_leaves_destination_untouched() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&dst.path().join("shared/keep.txt"), "keep");

        let outcome = sync_subtree(src.path(), dst.path(), "shared").unwrap();

        assert!(matches!(outcome, SubtreeOutcome::SkippedMissingSource { .. }));
        assert_eq!(
            fs::read_to_string(dst.path().join("shared/keep.txt")).unwrap(),
            "keep"
        );
    }

    #[test]
    fn creates_nested_destination_parents() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("config/eslint/base.js"), "module.exports = {}");
        write(&src.path().join("config/eslint/deep/more.js"), "x");

        let outcome = sync_subtree(src.path(), dst.path(), "config/eslint").unwrap();

        assert!(dst.path().join("config/eslint/deep/more.js").exists());
        assert!(matches!(
            outcome,
            SubtreeOutcome::Replaced {
                files: 2,
                replaced_existing: false,
                ..
            }
        ));
    }

    #[test]
    fn sync_subtrees_applies_each_name_in_order() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("shared/a.txt"), "a");
        let names = vec!["shared".to_string(), "absent".to_string()];

        let outcomes = sync_subtrees(src.path(), dst.path(), &names).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], SubtreeOutcome::Replaced { .. }));
        assert!(matches!(outcomes[1], SubtreeOutcome::SkippedMissingSource { .. }));
    }

    #[test]
    fn copy_tree_copies_single_file_root() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("one.txt"), "1");
        let n = copy_tree(&src.path().join("one.txt"), &dst.path().join("copy.txt")).unwrap();
        assert_eq!(n, 1);
        assert_eq!(fs::read_to_string(dst.path().join("copy.txt")).unwrap(), "1");
    }

    #[test]
    #[cfg(unix)]
    fn copy_tree_recreates_symlinks_and_modes() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        write(&root.join("run.sh"), "#!/bin/sh\n");
        fs::set_permissions(root.join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("run.sh", root.join("link")).unwrap();

        let out = dst.path().join("tree");
        copy_tree(&root, &out).unwrap();

        let mode = fs::metadata(out.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(fs::read_link(out.join("link")).unwrap(), PathBuf::from("run.sh"));
    }

    #[test]
    fn remove_path_reports_absence() {
        let dir = TempDir::new().unwrap();
        assert!(!remove_path(&dir.path().join("nothing")).unwrap());
        write(&dir.path().join("d/f"), "x");
        assert!(remove_path(&dir.path().join("d")).unwrap());
        assert!(!dir.path().join("d").exists());
    }
}
