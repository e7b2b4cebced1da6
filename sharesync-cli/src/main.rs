//! sharesync — copy shared configuration subtrees into a target repository.
//!
//! # Usage
//!
//! ```text
//! sharesync run --source-dir <DIR> --target-repo <NAME> --token <TOKEN>
//!               [--workspace <DIR>] [--config <FILE>] [--discard-snapshot]
//! sharesync prune [--workspace <DIR>] [--target-repo <NAME>] [--dry-run]
//! ```
//!
//! Inputs also read from the environment GitHub Actions provides
//! (`INPUT_SOURCE-DIR`, `INPUT_TARGET-REPO`, `INPUT_PAT-TOKEN`, `GITHUB_WORKSPACE`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{prune::PruneArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "sharesync",
    version,
    about = "Sync shared configuration subtrees into a target repository",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone the target, replace shared subtrees, commit and push.
    Run(RunArgs),

    /// Remove snapshot directories left behind by earlier runs.
    Prune(PruneArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Prune(args) => args.run(),
    }
}

/// Logs go to stderr; stdout carries the run report.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
