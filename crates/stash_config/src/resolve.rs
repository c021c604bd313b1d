//! Cache root resolution: turning a [`RootStrategy`] into a directory.

use crate::error::ConfigError;
use crate::types::{RootStrategy, StashConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files or directories whose presence marks a project root.
pub const PROJECT_MARKERS: &[&str] = &[".git", "Cargo.toml", ".here", "stash.toml"];

/// Returns the nearest ancestor of `start` (inclusive) that holds a project
/// marker, or `None` if no ancestor does.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()))
        .map(Path::to_path_buf)
}

/// Computes the cache root path for `config`, relative to the working
/// directory `cwd`. Does not touch the filesystem beyond marker lookups.
pub fn resolve_cache_root(config: &StashConfig, cwd: &Path) -> PathBuf {
    let base = match config.root {
        RootStrategy::Fixed => cwd.to_path_buf(),
        RootStrategy::Project => find_project_root(cwd).unwrap_or_else(|| {
            debug!("no project root above {}, using it directly", cwd.display());
            cwd.to_path_buf()
        }),
    };
    base.join(&config.dir_name)
}

/// Creates the cache root if it does not exist yet.
pub fn ensure_cache_root(root: &Path) -> Result<(), ConfigError> {
    if root.is_dir() {
        return Ok(());
    }
    debug!("creating stash directory {}", root.display());
    std::fs::create_dir_all(root).map_err(|source| ConfigError::RootCreation {
        path: root.to_path_buf(),
        source,
    })
}
