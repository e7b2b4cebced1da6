//! `sharesync run` — one sync transaction against one target.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use secrecy::SecretString;
use sharesync_core::TargetName;
use sharesync_sync::{Orchestrator, RunFailure, RunOutcome, RunReport, RunRequest, SystemRunner};

/// Arguments for `sharesync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Monorepo checkout holding the shared subtrees.
    #[arg(long, env = "INPUT_SOURCE-DIR")]
    pub source_dir: PathBuf,

    /// Short name of the repository to update.
    #[arg(long, env = "INPUT_TARGET-REPO")]
    pub target_repo: TargetName,

    /// Access token with push rights on the target.
    #[arg(long, env = "INPUT_PAT-TOKEN", hide_env_values = true)]
    pub token: String,

    /// Directory holding `temp/` and `logs/` (default: config or `.`).
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// YAML config file; missing keys use defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Remove the snapshot after a successful run.
    #[arg(long)]
    pub discard_snapshot: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let mut config = super::load_config(self.config.as_ref(), self.workspace)?;
        config.discard_snapshot |= self.discard_snapshot;
        config.validate().context("invalid configuration")?;

        let source_dir = self
            .source_dir
            .canonicalize()
            .with_context(|| format!("source dir {} not found", self.source_dir.display()))?;
        let request = RunRequest {
            source_dir,
            target: self.target_repo,
            token: SecretString::from(self.token),
        };

        let orchestrator = Orchestrator::new(config, SystemRunner);
        tracing::debug!(config = ?orchestrator.config(), "effective configuration");

        match orchestrator.run(&request) {
            Ok(report) => {
                print_report(&request, &report);
                Ok(())
            }
            Err(failure) => {
                print_failure(&failure);
                Err(failure.into())
            }
        }
    }
}

fn print_report(request: &RunRequest, report: &RunReport) {
    match &report.outcome {
        RunOutcome::Committed { log_file } => {
            println!(
                "✓ '{}' updated ({} changes pushed)",
                request.target,
                report.changes.len()
            );
            for change in &report.changes {
                println!("  {change}");
            }
            println!("  log: {}", log_file.display());
        }
        RunOutcome::NoChanges => {
            println!("✓ '{}' already up to date; nothing to commit", request.target);
        }
    }
    if let Some(snapshot) = &report.snapshot {
        println!("  snapshot kept at {}", snapshot.display());
    }
    println!("total elapsed: {:.3}s", report.elapsed.as_secs_f64());
}

fn print_failure(failure: &RunFailure) {
    println!("✗ sync failed during {}", failure.stage);
    println!("  rollback: {}", failure.rollback);
    println!("total elapsed: {:.3}s", failure.elapsed.as_secs_f64());
    if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
        println!("::error::{}", annotation(&failure.to_string()));
    }
}

/// Workflow commands are single-line; `%`, CR and LF must be escaped.
fn annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
