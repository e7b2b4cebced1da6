//! sharesync core library — domain types, run configuration, path layout, errors.
//!
//! Public API surface:
//! - [`types`] — target names, change descriptors, required scripts
//! - [`config`] — [`SyncConfig`] and its YAML loader
//! - [`paths`] — workspace layout helpers
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{GitIdentity, InstallCommand, SyncConfig};
pub use error::ConfigError;
pub use types::{ChangeDescriptor, ChangeKind, RequiredScripts, TargetName};
