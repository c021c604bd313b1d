//! `stash show`: print an entry's stored fingerprint.

use std::io::Write;

use stash_cache::{key, Stash, StashKey};

use crate::ReportFormat;

/// Runs the `stash show` command.
pub fn run(
    stash: &Stash,
    key_text: &str,
    format: ReportFormat,
    out: &mut impl Write,
) -> Result<i32, Box<dyn std::error::Error>> {
    let key = key::locate(&StashKey::from(key_text))?;
    let fingerprint = stash
        .fingerprint(&key)?
        .ok_or_else(|| format!("no stash entry for `{key_text}`"))?;

    match format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&fingerprint)?;
            writeln!(out, "{json}")?;
        }
        ReportFormat::Text => {
            writeln!(out, "{key}")?;
            let width = fingerprint
                .components()
                .iter()
                .map(|c| c.name.len())
                .max()
                .unwrap_or(0);
            for component in fingerprint.components() {
                writeln!(out, "  {:<width$}  {}", component.name, component.digest)?;
            }
            if !stash.contains(&key) {
                writeln!(out, "  (value missing: entry will be recomputed)")?;
            }
        }
    }
    Ok(0)
}
