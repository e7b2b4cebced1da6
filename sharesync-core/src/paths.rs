//! Workspace layout.
//!
//! ```text
//! <workspace>/
//!   temp/
//!     <target>/                       working copy
//!     <target>_backup_<unix_millis>/  snapshot
//!   logs/
//!     sync-<target>-<unix_millis>.log
//! ```
//!
//! All helpers are pure; nothing here touches the filesystem.

use std::path::{Path, PathBuf};

use crate::types::TargetName;

pub const TEMP_DIR: &str = "temp";
pub const LOGS_DIR: &str = "logs";
pub const SNAPSHOT_MARKER: &str = "_backup_";

pub fn temp_root(workspace: &Path) -> PathBuf {
    workspace.join(TEMP_DIR)
}

pub fn working_copy_dir(workspace: &Path, target: &TargetName) -> PathBuf {
    temp_root(workspace).join(target.as_str())
}

pub fn logs_dir(workspace: &Path) -> PathBuf {
    workspace.join(LOGS_DIR)
}

/// Sibling of `working_copy` named `<name>_backup_<unix_millis>`.
pub fn snapshot_path(working_copy: &Path, unix_millis: i64) -> PathBuf {
    let mut name = working_copy.as_os_str().to_owned();
    name.push(format!("{SNAPSHOT_MARKER}{unix_millis}"));
    PathBuf::from(name)
}

pub fn run_log_path(logs_dir: &Path, target: &TargetName, unix_millis: i64) -> PathBuf {
    logs_dir.join(format!("sync-{target}-{unix_millis}.log"))
}

/// Split a snapshot directory name into `(working copy name, unix millis)`.
///
/// Returns `None` for anything that is not a snapshot name.
pub fn parse_snapshot_name(file_name: &str) -> Option<(&str, i64)> {
    let (base, millis) = file_name.rsplit_once(SNAPSHOT_MARKER)?;
    if base.is_empty() || millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, millis.parse().ok()?))
}
