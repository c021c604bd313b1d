//! Process-wide settings for the stash memoization cache.
//!
//! Settings are assembled once at startup from built-in defaults, an optional
//! `stash.toml` in the working directory, and `STASH_*` environment
//! variables. The resulting [`StashConfig`] is read-only from then on and
//! also determines where the cache root directory lives.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{apply_env_overrides, load_config, load_config_from_str, load_settings};
pub use resolve::{ensure_cache_root, find_project_root, resolve_cache_root};
pub use types::*;
