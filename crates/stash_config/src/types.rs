//! Configuration types deserialized from `stash.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default name of the cache root directory.
pub const DEFAULT_DIR_NAME: &str = ".stash";

/// Process-wide stash settings.
///
/// Built once at startup and then only read. Per-call options fall back to
/// these values when they are left unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StashConfig {
    /// Return values directly instead of binding them into the caller's scope.
    pub functional: bool,
    /// Emit status messages at `info` level.
    pub verbose: bool,
    /// How the cache root directory is located.
    pub root: RootStrategy,
    /// Name of the cache root directory.
    pub dir_name: String,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            functional: false,
            verbose: true,
            root: RootStrategy::Fixed,
            dir_name: DEFAULT_DIR_NAME.to_string(),
        }
    }
}

/// Strategy for locating the cache root directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootStrategy {
    /// `<dir_name>` relative to the working directory.
    #[default]
    Fixed,
    /// `<dir_name>` relative to the enclosing project root.
    Project,
}

impl fmt::Display for RootStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootStrategy::Fixed => f.write_str("fixed"),
            RootStrategy::Project => f.write_str("project"),
        }
    }
}

impl FromStr for RootStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(RootStrategy::Fixed),
            "project" => Ok(RootStrategy::Project),
            other => Err(other.to_string()),
        }
    }
}
