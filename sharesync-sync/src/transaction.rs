//! The sync transaction: clone, snapshot, apply, commit, and roll back on failure.
//!
//! ```text
//! Start → Cloned → SnapshotTaken → Synced → Installed → Patched
//!       → Committed | NoChanges → Logged → Done
//!
//! any failure after SnapshotTaken → RolledBack → Failed
//! ```
//!
//! Clone and snapshot failures are fatal without rollback: nothing has been
//! mutated yet. Every later failure triggers exactly one restore attempt, and
//! the restore outcome is reported next to the original error, never instead
//! of it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sharesync_core::{ChangeDescriptor, SyncConfig, TargetName};
use thiserror::Error;

use crate::changes::detect_changes;
use crate::error::{io_err, SyncError};
use crate::manifest::{ensure_scripts, ManifestOutcome};
use crate::process::{CommandError, CommandRunner, CommandSpec};
use crate::run_log::RunLog;
use crate::snapshot::Snapshot;
use crate::tree::{sync_subtrees, SubtreeOutcome};

// ---------------------------------------------------------------------------
// Inputs and results
// ---------------------------------------------------------------------------

/// Per-run inputs.
#[derive(Debug)]
pub struct RunRequest {
    /// Local checkout the subtrees are copied from.
    pub source_dir: PathBuf,
    pub target: TargetName,
    /// Access token for the authenticated clone URL.
    pub token: SecretString,
}

/// Step of the transaction, used to say where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clone,
    Snapshot,
    Sync,
    Identity,
    Install,
    Manifest,
    Staging,
    Detect,
    Commit,
    Push,
    Log,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clone => "clone",
            Stage::Snapshot => "snapshot",
            Stage::Sync => "subtree sync",
            Stage::Identity => "git identity",
            Stage::Install => "dependency install",
            Stage::Manifest => "manifest patch",
            Stage::Staging => "staging",
            Stage::Detect => "change detection",
            Stage::Commit => "commit",
            Stage::Push => "push",
            Stage::Log => "run log",
        };
        f.write_str(name)
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Changes were committed, pushed and logged.
    Committed { log_file: PathBuf },
    /// Nothing differed from the target's last commit; no commit, push or log.
    NoChanges,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub working_copy: PathBuf,
    /// Changes seen before the sync (informational).
    pub preview: Vec<ChangeDescriptor>,
    /// Changes that were committed (empty for `NoChanges`).
    pub changes: Vec<ChangeDescriptor>,
    pub subtrees: Vec<SubtreeOutcome>,
    pub manifest: ManifestOutcome,
    /// Snapshot left on disk, or `None` if it was discarded.
    pub snapshot: Option<PathBuf>,
    pub elapsed: Duration,
}

/// What happened to the working copy after a failure.
#[derive(Debug)]
pub enum Rollback {
    /// The failure happened before a snapshot existed.
    NotAttempted,
    Restored,
    Failed(SyncError),
}

impl fmt::Display for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rollback::NotAttempted => f.write_str("no rollback needed"),
            Rollback::Restored => f.write_str("working copy restored from snapshot"),
            Rollback::Failed(e) => write!(f, "rollback failed: {e}"),
        }
    }
}

/// Terminal failure of a run. `error` is always the root cause.
#[derive(Debug, Error)]
#[error("sync failed during {stage}: {error}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: SyncError,
    pub rollback: Rollback,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs one sync transaction against one target repository.
pub struct Orchestrator<R> {
    config: SyncConfig,
    runner: R,
}

/// Result of the mutating part of the run, before the snapshot is settled.
struct Applied {
    outcome: RunOutcome,
    preview: Vec<ChangeDescriptor>,
    changes: Vec<ChangeDescriptor>,
    subtrees: Vec<SubtreeOutcome>,
    manifest: ManifestOutcome,
}

type StepResult<T> = Result<T, (Stage, SyncError)>;

fn at(stage: Stage) -> impl FnOnce(SyncError) -> (Stage, SyncError) {
    move |e| (stage, e)
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(config: SyncConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run the whole transaction. Elapsed time is reported on both paths.
    pub fn run(&self, request: &RunRequest) -> Result<RunReport, RunFailure> {
        let started = Instant::now();
        tracing::info!(
            "sync start: {} -> {} ({})",
            request.source_dir.display(),
            request.target,
            Utc::now().to_rfc3339()
        );

        let result = self.execute(request, started);
        let elapsed = started.elapsed();
        tracing::info!("total elapsed: {:.3}s", elapsed.as_secs_f64());

        match result {
            Ok(mut report) => {
                report.elapsed = elapsed;
                Ok(report)
            }
            Err((stage, error, rollback)) => {
                let failure = RunFailure {
                    stage,
                    error,
                    rollback,
                    elapsed,
                };
                tracing::error!("{failure}");
                Err(failure)
            }
        }
    }

    fn execute(
        &self,
        request: &RunRequest,
        started: Instant,
    ) -> Result<RunReport, (Stage, SyncError, Rollback)> {
        let working_copy = self.config.working_copy_dir(&request.target);

        self.clone_target(request, &working_copy)
            .map_err(|e| (Stage::Clone, e, Rollback::NotAttempted))?;

        let snapshot = Snapshot::create(&working_copy)
            .map_err(|e| (Stage::Snapshot, e, Rollback::NotAttempted))?;

        match self.apply(request, &working_copy, started) {
            Ok(applied) => Ok(RunReport {
                outcome: applied.outcome,
                working_copy,
                preview: applied.preview,
                changes: applied.changes,
                subtrees: applied.subtrees,
                manifest: applied.manifest,
                snapshot: self.settle_snapshot(snapshot),
                elapsed: Duration::ZERO,
            }),
            Err((stage, error)) => {
                tracing::error!(
                    "{stage} failed: {error}; rolling back {}",
                    snapshot.original().display()
                );
                let rollback = match snapshot.restore() {
                    Ok(()) => {
                        tracing::info!("rollback complete");
                        Rollback::Restored
                    }
                    Err(e) => {
                        tracing::error!("rollback failed: {e}");
                        Rollback::Failed(e)
                    }
                };
                Err((stage, error, rollback))
            }
        }
    }

    fn clone_target(&self, request: &RunRequest, working_copy: &Path) -> Result<(), SyncError> {
        if let Some(parent) = working_copy.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let url = self
            .config
            .clone_url(&request.target, request.token.expose_secret());
        let spec = CommandSpec::new("git")
            .arg("clone")
            .arg(url)
            .arg(working_copy.to_string_lossy());
        self.runner.run(&spec).map_err(SyncError::CloneFailed)?;
        Ok(())
    }

    /// Steps 3–9: everything that runs under the snapshot.
    fn apply(
        &self,
        request: &RunRequest,
        working_copy: &Path,
        started: Instant,
    ) -> StepResult<Applied> {
        let config = &self.config;

        let preview = match detect_changes(&self.runner, working_copy) {
            Ok(preview) => {
                tracing::info!("expected changes ({}):", preview.len());
                for change in &preview {
                    tracing::info!("  {change}");
                }
                preview
            }
            Err(e) => {
                tracing::warn!("change preview unavailable: {e}");
                Vec::new()
            }
        };

        let subtrees = sync_subtrees(&request.source_dir, working_copy, &config.subtrees)
            .map_err(at(Stage::Sync))?;

        self.git(working_copy, ["config", "user.name", config.identity.name.as_str()])
            .map_err(SyncError::CommitFailed)
            .map_err(at(Stage::Identity))?;
        self.git(working_copy, ["config", "user.email", config.identity.email.as_str()])
            .map_err(SyncError::CommitFailed)
            .map_err(at(Stage::Identity))?;

        self.install(working_copy).map_err(at(Stage::Install))?;

        let manifest = ensure_scripts(working_copy, &config.manifest, &config.required_scripts)
            .map_err(at(Stage::Manifest))?;

        self.git(working_copy, ["add", "."])
            .map_err(SyncError::CommitFailed)
            .map_err(at(Stage::Staging))?;
        let changes = detect_changes(&self.runner, working_copy).map_err(at(Stage::Detect))?;

        if changes.is_empty() {
            tracing::info!("no changes to commit");
            return Ok(Applied {
                outcome: RunOutcome::NoChanges,
                preview,
                changes,
                subtrees,
                manifest,
            });
        }

        let message = commit_message(&config.commit_title, &config.install.program, &changes);
        self.git(working_copy, ["commit", "-m", message.as_str()])
            .map_err(SyncError::CommitFailed)
            .map_err(at(Stage::Commit))?;
        self.git(working_copy, ["push", "origin", "HEAD"])
            .map_err(SyncError::PushFailed)
            .map_err(at(Stage::Push))?;

        let log = RunLog {
            synced_at: Utc::now(),
            target: &request.target,
            source_dir: &request.source_dir,
            changes: &changes,
            elapsed: started.elapsed(),
        };
        let log_file = log.write(&config.logs_dir()).map_err(at(Stage::Log))?;
        tracing::info!("sync completed: {} changes pushed", changes.len());

        Ok(Applied {
            outcome: RunOutcome::Committed { log_file },
            preview,
            changes,
            subtrees,
            manifest,
        })
    }

    fn install(&self, working_copy: &Path) -> Result<(), SyncError> {
        let install = &self.config.install;
        if !working_copy.join(&install.lockfile).is_file() {
            tracing::info!("no {} found; skipping install", install.lockfile);
            return Ok(());
        }
        let spec = CommandSpec::new(install.program.as_str())
            .args(install.args.iter().map(String::as_str))
            .current_dir(working_copy);
        self.runner.run(&spec).map_err(SyncError::InstallFailed)?;
        Ok(())
    }

    fn git<'a>(
        &self,
        working_copy: &Path,
        args: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), CommandError> {
        self.runner
            .run(&CommandSpec::git_in(working_copy).args(args))
            .map(|_| ())
    }

    /// Success path: keep the snapshot on disk, or remove it when configured.
    fn settle_snapshot(&self, snapshot: Snapshot) -> Option<PathBuf> {
        if !self.config.discard_snapshot {
            let path = snapshot.release();
            tracing::info!("snapshot kept at {}", path.display());
            return Some(path);
        }
        let path = snapshot.path().to_path_buf();
        match snapshot.discard() {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("could not discard snapshot: {e}");
                Some(path)
            }
        }
    }
}

/// Commit message embedding every change descriptor, one per line, in order.
pub fn commit_message(title: &str, installer: &str, changes: &[ChangeDescriptor]) -> String {
    let mut lines = vec![title.to_owned(), String::new(), "Changed files:".to_owned()];
    lines.extend(changes.iter().map(|c| format!("- {c}")));
    lines.push(String::new());
    lines.push(format!(
        "If package changes are included, run {installer} install."
    ));
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
