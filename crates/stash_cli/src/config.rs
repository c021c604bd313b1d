//! `stash config`: print the effective settings.

use std::io::Write;
use std::path::Path;

use stash_config::{resolve_cache_root, StashConfig};

/// Runs the `stash config` command.
///
/// Prints the settings as TOML followed by the stash directory they select.
/// Does not create the directory.
pub fn run(
    config: &StashConfig,
    cwd: &Path,
    root_override: Option<&Path>,
    out: &mut impl Write,
) -> Result<i32, Box<dyn std::error::Error>> {
    let root = match root_override {
        Some(root) => root.to_path_buf(),
        None => resolve_cache_root(config, cwd),
    };
    write!(out, "{}", toml::to_string(config)?)?;
    writeln!(out, "# stash directory: {}", root.display())?;
    Ok(0)
}
