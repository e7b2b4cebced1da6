//! `sharesync prune` — remove kept snapshots.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sharesync_core::{paths, TargetName};
use sharesync_sync::prune::prune_snapshots;

/// Arguments for `sharesync prune`.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Directory holding `temp/` (default: config or `.`).
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Only remove snapshots of this target.
    #[arg(long)]
    pub target_repo: Option<TargetName>,

    /// YAML config file; only `workspace` is used.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List what would be removed without deleting anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl PruneArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config(self.config.as_ref(), self.workspace)?;
        let temp_root = paths::temp_root(&config.workspace);
        let removed = prune_snapshots(&temp_root, self.target_repo.as_ref(), self.dry_run)
            .with_context(|| format!("failed to prune snapshots under {}", temp_root.display()))?;

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        if removed.is_empty() {
            println!("{prefix}no snapshots under {}", temp_root.display());
            return Ok(());
        }
        let verb = if self.dry_run { "would remove" } else { "removed" };
        for snapshot in &removed {
            let when = snapshot
                .created_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown time".to_owned());
            println!("{prefix}{verb} {} ({when})", snapshot.path.display());
        }
        println!("{prefix}{} snapshot(s)", removed.len());
        Ok(())
    }
}
