//! `stash list`: enumerate stored entries.

use std::io::Write;

use stash_cache::Stash;

/// Runs the `stash list` command.
///
/// Prints one line per complete entry with its dependency names.
pub fn run(stash: &Stash, out: &mut impl Write) -> Result<i32, Box<dyn std::error::Error>> {
    let keys = stash.keys()?;
    for key in &keys {
        let deps = match stash.fingerprint(key)? {
            Some(fp) => {
                let names: Vec<&str> = fp.dependency_names().collect();
                if names.is_empty() {
                    "none".to_string()
                } else {
                    names.join(", ")
                }
            }
            None => "unreadable fingerprint".to_string(),
        };
        writeln!(out, "{key}  (depends on: {deps})")?;
    }
    if keys.is_empty() {
        writeln!(out, "no stashed entries in {}", stash.root().display())?;
    }
    Ok(0)
}
