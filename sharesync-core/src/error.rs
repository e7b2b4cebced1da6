//! Error types for sharesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A target repository name that cannot be used as a path segment or URL slug.
    #[error("invalid target repository name '{name}': {reason}")]
    InvalidTarget { name: String, reason: &'static str },

    /// A config value that parsed but makes no sense.
    #[error("invalid config: {0}")]
    Invalid(String),
}
