//! Required-script patching for the project manifest (`package.json`).
//!
//! Only presence is enforced: a script that already exists keeps its value
//! even if it differs from the required command. The file is rewritten only
//! when something was added, and untouched fields keep their order.

use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde_json::{Map, Value};
use sharesync_core::RequiredScripts;

use crate::error::{io_err, SyncError};

/// Outcome of [`ensure_scripts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestOutcome {
    /// No manifest in the working copy; nothing to do.
    Missing { path: PathBuf },
    /// Every required script was already present.
    Unchanged { path: PathBuf },
    /// The listed scripts were inserted and the file rewritten.
    Patched { path: PathBuf, added: Vec<String> },
}

/// Ensure `working_copy/<manifest>` declares every script in `required`.
pub fn ensure_scripts(
    working_copy: &Path,
    manifest: &str,
    required: &RequiredScripts,
) -> Result<ManifestOutcome, SyncError> {
    let path = working_copy.join(manifest);
    if !path.is_file() {
        tracing::debug!("no manifest at {}", path.display());
        return Ok(ManifestOutcome::Missing { path });
    }
    if required.is_empty() {
        return Ok(ManifestOutcome::Unchanged { path });
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let parse_err = |source| SyncError::ManifestParse {
        path: path.clone(),
        source,
    };
    let mut doc: Value = serde_json::from_str(&contents).map_err(parse_err)?;

    let added = add_missing_scripts(&mut doc, required).map_err(parse_err)?;
    if added.is_empty() {
        return Ok(ManifestOutcome::Unchanged { path });
    }

    let mut rendered = serde_json::to_string_pretty(&doc).map_err(parse_err)?;
    rendered.push('\n');
    write_atomic(&path, &rendered)?;

    tracing::info!("{}: added scripts {}", path.display(), added.join(", "));
    Ok(ManifestOutcome::Patched { path, added })
}

/// Insert absent scripts into `doc`, returning the names added in table order.
fn add_missing_scripts(
    doc: &mut Value,
    required: &RequiredScripts,
) -> Result<Vec<String>, serde_json::Error> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| serde_json::Error::custom("manifest root must be a JSON object"))?;

    let missing: Vec<(&str, &str)> = {
        let existing = root.get("scripts").and_then(Value::as_object);
        required
            .iter()
            .filter(|(name, _)| existing.map_or(true, |s| !s.contains_key(*name)))
            .collect()
    };
    if root.get("scripts").is_some_and(|s| !s.is_object()) {
        return Err(serde_json::Error::custom("\"scripts\" must be a JSON object"));
    }
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    let scripts = root
        .entry("scripts")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| serde_json::Error::custom("\"scripts\" must be a JSON object"))?;

    let mut added = Vec::with_capacity(missing.len());
    for (name, command) in missing {
        scripts.insert(name.to_owned(), Value::String(command.to_owned()));
        added.push(name.to_owned());
    }
    Ok(added)
}

/// Write to `<path>.sharesync.tmp` then rename over `path`.
fn write_atomic(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.sharesync.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
