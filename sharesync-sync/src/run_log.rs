//! Plain-text record of a committed sync run.
//!
//! Written once to `<logs>/sync-<target>-<unix_millis>.log`; never read back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sharesync_core::{paths, ChangeDescriptor, TargetName};

use crate::error::{io_err, SyncError};

#[derive(Debug, Clone)]
pub struct RunLog<'a> {
    pub synced_at: DateTime<Utc>,
    pub target: &'a TargetName,
    pub source_dir: &'a Path,
    pub changes: &'a [ChangeDescriptor],
    pub elapsed: Duration,
}

impl RunLog<'_> {
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "synced at: {}",
                self.synced_at.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            format!("target: {}", self.target),
            format!("source: {}", self.source_dir.display()),
            "changes:".to_owned(),
        ];
        lines.extend(self.changes.iter().map(ToString::to_string));
        lines.push(String::new());
        lines.push(format!("elapsed: {:.3}s", self.elapsed.as_secs_f64()));
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    /// Write the log under `logs_dir`, creating the directory if needed.
    pub fn write(&self, logs_dir: &Path) -> Result<PathBuf, SyncError> {
        std::fs::create_dir_all(logs_dir).map_err(|e| io_err(logs_dir, e))?;
        let path = paths::run_log_path(logs_dir, self.target, self.synced_at.timestamp_millis());
        std::fs::write(&path, self.render()).map_err(|e| io_err(&path, e))?;
        tracing::info!("run log written: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn render_lists_every_change_in_order() {
        let target: TargetName = "app".parse().unwrap();
        let changes = vec![
            ChangeDescriptor::parse("M\tshared/config.json"),
            ChangeDescriptor::parse("D\tshared/extra.txt"),
        ];
        let log = RunLog {
            synced_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            target: &target,
            source_dir: Path::new("/src/monorepo"),
            changes: &changes,
            elapsed: Duration::from_millis(2500),
        };

        assert_eq!(
            log.render(),
            "synced at: 2024-03-01T12:00:00.000Z\n\
             target: app\n\
             source: /src/monorepo\n\
             changes:\n\
             M\tshared/config.json\n\
             D\tshared/extra.txt\n\
             \n\
             elapsed: 2.500s\n"
        );
    }

    #[test]
    fn write_creates_log_dir_and_names_file_after_target() {
        let tmp = TempDir::new().unwrap();
        let target: TargetName = "web".parse().unwrap();
        let synced_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let log = RunLog {
            synced_at,
            target: &target,
            source_dir: Path::new("."),
            changes: &[],
            elapsed: Duration::ZERO,
        };

        let logs = tmp.path().join("logs");
        let path = log.write(&logs).unwrap();

        assert_eq!(path, logs.join("sync-web-1700000000000.log"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("target: web"));
    }
}
