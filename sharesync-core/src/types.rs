//! Domain types shared by the sync engine and the CLI.
//!
//! All types that appear in the config file are serializable via serde + serde_yaml.

use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Short name of the target repository.
///
/// Used both as the working-copy directory name and as the repository slug
/// under the configured organization, so it must be a single safe path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetName(String);

impl TargetName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TargetName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ConfigError::InvalidTarget {
            name: s.to_owned(),
            reason,
        };
        if s.is_empty() {
            return Err(invalid("name is empty"));
        }
        if s == "." || s == ".." {
            return Err(invalid("name is a relative path component"));
        }
        if s.ends_with(".git") {
            return Err(invalid("pass the bare name without the .git suffix"));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for TargetName {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TargetName> for String {
    fn from(t: TargetName) -> Self {
        t.0
    }
}

// ---------------------------------------------------------------------------
// Change descriptors
// ---------------------------------------------------------------------------

/// Status of a single path in `git diff --name-status` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    /// Rename with git's similarity score (0–100).
    Renamed { score: u8 },
    /// Copy with git's similarity score (0–100).
    Copied { score: u8 },
    TypeChanged,
    Unmerged,
    /// Any status letter git may add that we do not model.
    Unknown(char),
}

impl ChangeKind {
    /// Parse a status token such as `M`, `D` or `R087`.
    pub fn from_status(token: &str) -> Self {
        let mut chars = token.chars();
        let Some(letter) = chars.next() else {
            return Self::Unknown(' ');
        };
        let score = || chars.as_str().parse::<u8>().unwrap_or(0);
        match letter {
            'A' => Self::Added,
            'M' => Self::Modified,
            'D' => Self::Deleted,
            'R' => Self::Renamed { score: score() },
            'C' => Self::Copied { score: score() },
            'T' => Self::TypeChanged,
            'U' => Self::Unmerged,
            other => Self::Unknown(other),
        }
    }

    /// Whether this status carries a source and a destination path.
    pub fn has_two_paths(&self) -> bool {
        matches!(self, Self::Renamed { .. } | Self::Copied { .. })
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
            ChangeKind::Renamed { score } => write!(f, "renamed ({score}%)"),
            ChangeKind::Copied { score } => write!(f, "copied ({score}%)"),
            ChangeKind::TypeChanged => write!(f, "type changed"),
            ChangeKind::Unmerged => write!(f, "unmerged"),
            ChangeKind::Unknown(c) => write!(f, "unknown ({c})"),
        }
    }
}

/// One changed path as reported by the change detector.
///
/// `line` is the verbatim status line; it is what gets displayed, logged and
/// embedded in commit messages. `kind`, `path` and `from` are parsed from it
/// for programmatic decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescriptor {
    pub kind: ChangeKind,
    /// Path after the change (destination for renames and copies).
    pub path: String,
    /// Source path for renames and copies.
    pub from: Option<String>,
    pub line: String,
}

impl ChangeDescriptor {
    /// Parse one line of `git diff --name-status` output.
    ///
    /// Never fails: a line that does not follow the tab-separated format is
    /// kept as an `Unknown` descriptor whose path is the whole line.
    pub fn parse(line: &str) -> Self {
        let mut fields = line.split('\t');
        let status = fields.next().unwrap_or_default();
        let rest: Vec<&str> = fields.collect();
        let kind = ChangeKind::from_status(status);

        let (path, from) = match (kind.has_two_paths(), rest.as_slice()) {
            (true, [from, to]) => (to.to_string(), Some(from.to_string())),
            (false, [path]) => (path.to_string(), None),
            _ => {
                return Self {
                    kind: ChangeKind::Unknown(status.chars().next().unwrap_or(' ')),
                    path: line.to_owned(),
                    from: None,
                    line: line.to_owned(),
                }
            }
        };

        Self {
            kind,
            path,
            from,
            line: line.to_owned(),
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.kind == ChangeKind::Deleted
    }
}

impl fmt::Display for ChangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

// ---------------------------------------------------------------------------
// Required scripts
// ---------------------------------------------------------------------------

/// Script name → command that must be present in the project manifest.
///
/// Presence is what counts: an existing script with a different command is
/// left alone. Entries keep the order they were written in, which is the
/// order missing scripts are appended to the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredScripts(Vec<(String, String)>);

impl RequiredScripts {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set `name`, replacing an earlier command in place.
    fn insert(&mut self, name: String, command: String) {
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = command,
            None => self.0.push((name, command)),
        }
    }
}

impl Default for RequiredScripts {
    fn default() -> Self {
        Self::from_iter([
            ("check-all", "yarn lint && yarn type-check"),
            ("lint", "eslint . --ext .ts,.tsx"),
            ("type-check", "tsc --noEmit"),
        ])
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequiredScripts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut scripts = Self(Vec::new());
        for (k, v) in iter {
            scripts.insert(k.into(), v.into());
        }
        scripts
    }
}

impl Serialize for RequiredScripts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for RequiredScripts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ScriptsVisitor)
    }
}

/// Reads a YAML/JSON map in document order.
struct ScriptsVisitor;

impl<'de> Visitor<'de> for ScriptsVisitor {
    type Value = RequiredScripts;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of script name to command")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut scripts = RequiredScripts(Vec::with_capacity(map.size_hint().unwrap_or(0)));
        while let Some((name, command)) = map.next_entry::<String, String>()? {
            if scripts.get(&name).is_some() {
                return Err(serde::de::Error::custom(format!(
                    "duplicate required script '{name}'"
                )));
            }
            scripts.0.push((name, command));
        }
        Ok(scripts)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_name_display() {
        let t: TargetName = "frontend-app".parse().unwrap();
        assert_eq!(t.to_string(), "frontend-app");
        assert_eq!(t.as_str(), "frontend-app");
    }

    #[test]
    fn target_name_rejects_path_separators() {
        let err = "../etc".parse::<TargetName>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTarget { .. }), "got: {err}");
        assert!("a/b".parse::<TargetName>().is_err());
        assert!("".parse::<TargetName>().is_err());
        assert!("repo.git".parse::<TargetName>().is_err());
    }

    #[test]
    fn rename_line_keeps_both_paths() {
        let d = ChangeDescriptor::parse("R087\tshared/old.json\tshared/new.json");
        assert_eq!(d.kind, ChangeKind::Renamed { score: 87 });
        assert_eq!(d.path, "shared/new.json");
        assert_eq!(d.from.as_deref(), Some("shared/old.json"));
        assert_eq!(d.to_string(), "R087\tshared/old.json\tshared/new.json");
    }

    #[test]
    fn malformed_line_is_kept_verbatim() {
        let d = ChangeDescriptor::parse("garbage without tabs");
        assert!(matches!(d.kind, ChangeKind::Unknown('g')));
        assert_eq!(d.path, "garbage without tabs");
        assert_eq!(d.to_string(), "garbage without tabs");
    }

    #[test]
    fn default_required_scripts() {
        let scripts = RequiredScripts::default();
        let names: Vec<_> = scripts.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["check-all", "lint", "type-check"]);
        assert_eq!(scripts.get("type-check"), Some("tsc --noEmit"));
    }

    #[test]
    fn required_scripts_keep_insertion_order() {
        let scripts: RequiredScripts =
            [("test", "vitest"), ("build", "vite build"), ("test", "vitest run")]
                .into_iter()
                .collect();
        let entries: Vec<_> = scripts.iter().collect();
        assert_eq!(entries, [("test", "vitest run"), ("build", "vite build")]);
        assert!(!scripts.is_empty());
    }
}
