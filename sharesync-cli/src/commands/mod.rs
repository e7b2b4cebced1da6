pub mod prune;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use sharesync_core::SyncConfig;

/// Config file (or defaults), with the workspace flag applied on top.
pub fn load_config(config: Option<&PathBuf>, workspace: Option<PathBuf>) -> Result<SyncConfig> {
    let mut cfg = match config {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(workspace) = workspace {
        cfg.workspace = workspace;
    }
    Ok(cfg)
}
