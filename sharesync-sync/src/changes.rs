//! Pending-change detection for a working copy.

use std::path::Path;

use sharesync_core::ChangeDescriptor;

use crate::error::SyncError;
use crate::process::{CommandError, CommandRunner, CommandSpec};

/// Object id of the empty tree, the diff base for a branch with no commits.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Changes in `working_copy` relative to its last commit, in git's order.
///
/// Runs `git diff --name-status HEAD`, so staged and unstaged edits to
/// tracked files are both reported; untracked files only show up once staged.
/// A working copy with no commits yet is diffed from the empty tree, which
/// reports staged files only. No changes is an empty vec, not an error.
pub fn detect_changes(
    runner: &dyn CommandRunner,
    working_copy: &Path,
) -> Result<Vec<ChangeDescriptor>, SyncError> {
    let git = CommandSpec::git_in(working_copy);
    let spec = if has_head(runner, working_copy)? {
        git.args(["diff", "--name-status", "HEAD"])
    } else {
        tracing::debug!("{} has no commits; diffing from the empty tree", working_copy.display());
        git.args(["diff", "--name-status", "--cached", EMPTY_TREE])
    };
    let output = runner.run(&spec).map_err(SyncError::DetectFailed)?;
    Ok(parse_name_status(&output.stdout))
}

/// Whether `HEAD` resolves to a commit. Only a failed lookup means "no";
/// a git that cannot be started is still an error.
fn has_head(runner: &dyn CommandRunner, working_copy: &Path) -> Result<bool, SyncError> {
    let spec = CommandSpec::git_in(working_copy).args(["rev-parse", "--verify", "-q", "HEAD"]);
    match runner.run(&spec) {
        Ok(_) => Ok(true),
        Err(CommandError::Failed { .. }) => Ok(false),
        Err(e) => Err(SyncError::DetectFailed(e)),
    }
}

/// One descriptor per non-empty line.
pub fn parse_name_status(stdout: &str) -> Vec<ChangeDescriptor> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(ChangeDescriptor::parse)
        .collect()
}
