//! Content-addressed memoization cache.
//!
//! A computation (code text plus the names of the values it depends on) is
//! run once and its result persisted under a cache key. Later calls compare
//! a fingerprint of the canonical code and the current dependency values
//! against the stored one, and either reuse the stored result or recompute
//! and overwrite it.
//!
//! ```no_run
//! use stash_cache::{BoxError, Computation, Lookup, Scope, Stash, StashOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stash = Stash::from_env()?;
//! let mut scope = Scope::new();
//! scope.set_value("dep", &5)?;
//!
//! let value = stash.stash(
//!     "r1",
//!     Computation::new("r1 = 10 + dep", |scope| {
//!         let dep: i64 = scope.get_as("dep")?.ok_or("dep unbound")?;
//!         Ok::<_, BoxError>(10 + dep)
//!     }),
//!     &StashOptions::new().depends_on(["dep"]).functional(true),
//!     &mut scope,
//! )?;
//! assert_eq!(value, Some(15));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod canon;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod scope;
pub mod stash;
pub mod store;

pub use canon::{Canonicalizer, WhitespaceCanonicalizer};
pub use error::{BoxError, CacheError};
pub use fingerprint::{Component, Fingerprint, FingerprintBuilder, CODE_COMPONENT};
pub use key::{CacheKey, StashKey};
pub use scope::{Binding, ChildScope, Lookup, Scope};
pub use stash::{Computation, EntryStatus, Resolved, Stash, StashOptions};
pub use store::{ArtifactStore, FingerprintStore, ValueStore};
pub use stash_config::StashConfig;
