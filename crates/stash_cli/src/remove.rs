//! `stash unstash` and `stash clear`: explicit entry removal.

use stash_cache::Stash;

use crate::GlobalArgs;

/// Runs the `stash unstash` command.
///
/// Returns exit code 1 if any of the keys had no entry.
pub fn unstash(
    stash: &Stash,
    keys: &[String],
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut missing = 0;
    for key in keys {
        if stash.unstash(key.as_str())? {
            if !global.quiet {
                eprintln!("     Removed {key}");
            }
        } else {
            missing += 1;
            eprintln!("warning: no stash entry for `{key}`");
        }
    }
    Ok(if missing == 0 { 0 } else { 1 })
}

/// Runs the `stash clear` command.
pub fn clear(stash: &Stash, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let removed = stash.clear()?;
    if !global.quiet {
        eprintln!(
            "     Cleared {removed} entries from {}",
            stash.root().display()
        );
    }
    Ok(0)
}
