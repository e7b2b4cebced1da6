//! # sharesync-sync
//!
//! Snapshot-guarded subtree sync into a freshly cloned target repository.
//!
//! Build an [`Orchestrator`] from a [`sharesync_core::SyncConfig`] and a
//! [`CommandRunner`] (normally [`SystemRunner`]), then call
//! [`Orchestrator::run`] once per target.

pub mod changes;
pub mod error;
pub mod manifest;
pub mod process;
pub mod prune;
pub mod run_log;
pub mod snapshot;
pub mod transaction;
pub mod tree;

pub use error::SyncError;
pub use process::{CommandError, CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use snapshot::Snapshot;
pub use transaction::{
    Orchestrator, Rollback, RunFailure, RunOutcome, RunReport, RunRequest, Stage,
};
