//! The stash controller.
//!
//! [`Stash`] ties together the canonicalizer, fingerprint builder, key
//! validation, and the two artifact stores. For each call it decides whether
//! the stored value can be reused or the computation has to run again.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use stash_config::{ensure_cache_root, load_settings, resolve_cache_root, StashConfig};
use tracing::{debug, info};

use crate::canon::{Canonicalizer, WhitespaceCanonicalizer};
use crate::error::{BoxError, CacheError};
use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::key::{self, CacheKey, StashKey};
use crate::scope::{ChildScope, Scope};
use crate::store::{
    scan_keys, ArtifactStore, FingerprintStore, ValueStore, FINGERPRINT_EXT, VALUE_EXT,
};

/// A named block of code together with the closure that evaluates it.
///
/// The code text is what gets fingerprinted; the body is only run when the
/// stash is missing or stale.
pub struct Computation<F> {
    code: String,
    body: F,
}

impl<F> Computation<F> {
    /// Pairs `code` with the closure that evaluates it.
    pub fn new<T>(code: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&mut ChildScope<'_>) -> Result<T, BoxError>,
    {
        Self {
            code: code.into(),
            body,
        }
    }

    /// The computation's source text.
    pub fn code(&self) -> &str {
        &self.code
    }
}

/// Per-call options for [`Stash::stash`].
///
/// `None` fields fall back to the stash's [`StashConfig`].
#[derive(Debug, Clone, Default)]
pub struct StashOptions {
    /// Names in the caller's scope the result depends on.
    pub depends_on: Vec<String>,
    /// Return the value instead of binding it into the caller's scope.
    pub functional: Option<bool>,
    /// Emit status messages at `info` level.
    pub verbose: Option<bool>,
}

impl StashOptions {
    /// Options with no dependencies and configured defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dependency names.
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides functional mode.
    pub fn functional(mut self, functional: bool) -> Self {
        self.functional = Some(functional);
        self
    }

    /// Overrides verbosity.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }
}

/// How a call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// No complete entry existed; the computation ran and was stored.
    Stored,
    /// The stored fingerprint did not match; the computation ran again.
    Updated,
    /// The stored value was reused without running the computation.
    Loaded,
}

impl EntryStatus {
    /// The human-readable status message.
    pub fn message(self) -> &'static str {
        match self {
            EntryStatus::Stored => "stashing object",
            EntryStatus::Updated => "updating stash",
            EntryStatus::Loaded => "loading stashed object",
        }
    }

    /// Returns `true` if the computation was executed.
    pub fn executed(self) -> bool {
        !matches!(self, EntryStatus::Loaded)
    }
}

/// A value together with how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// The computed or loaded value.
    pub value: T,
    /// Whether it was stored, updated, or loaded.
    pub status: EntryStatus,
}

/// A cache root plus the settings used to operate on it.
pub struct Stash {
    root: PathBuf,
    config: StashConfig,
    canonicalizer: Box<dyn Canonicalizer>,
    fingerprints: FingerprintStore,
}

impl Stash {
    /// Opens the stash for the working directory, loading settings from
    /// `stash.toml` and the environment.
    pub fn from_env() -> Result<Self, CacheError> {
        let cwd = std::env::current_dir().map_err(|e| CacheError::io(".", e))?;
        let config = load_settings(&cwd)?;
        Self::open(config, &cwd)
    }

    /// Opens the stash whose root `config` selects relative to `cwd`.
    pub fn open(config: StashConfig, cwd: &Path) -> Result<Self, CacheError> {
        let root = resolve_cache_root(&config, cwd);
        Self::at(root, config)
    }

    /// Opens a stash at an explicit root, creating the directory if needed.
    pub fn at(root: impl Into<PathBuf>, config: StashConfig) -> Result<Self, CacheError> {
        let root = root.into();
        ensure_cache_root(&root)?;
        Ok(Self {
            fingerprints: FingerprintStore::new(&root),
            root,
            config,
            canonicalizer: Box::new(WhitespaceCanonicalizer),
        })
    }

    /// Replaces the default whitespace canonicalizer.
    pub fn with_canonicalizer(mut self, canonicalizer: impl Canonicalizer + 'static) -> Self {
        self.canonicalizer = Box::new(canonicalizer);
        self
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The settings this stash was opened with.
    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// Returns `true` if both artifacts for `key` are present.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.fingerprints.exists(key) && self.values::<()>().exists(key)
    }

    /// Stashes a computation under `key`.
    ///
    /// In functional mode the value is returned as `Some`, and arbitrary
    /// keys are accepted by deriving a digest key. Otherwise `key` must be an
    /// identifier; the value is bound into `scope` under that name and
    /// `None` is returned.
    pub fn stash<T, F>(
        &self,
        key: impl Into<StashKey>,
        computation: Computation<F>,
        options: &StashOptions,
        scope: &mut Scope,
    ) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut ChildScope<'_>) -> Result<T, BoxError>,
    {
        let functional = options.functional.unwrap_or(self.config.functional);
        let verbose = options.verbose.unwrap_or(self.config.verbose);
        let key = key::validate(&key.into(), functional)?;

        let resolved = self.resolve_with(&key, computation, &options.depends_on, scope, verbose)?;
        if functional {
            return Ok(Some(resolved.value));
        }
        scope.set_value(key.as_str(), &resolved.value)?;
        Ok(None)
    }

    /// Returns the value for `key`, reusing the stored one when the
    /// fingerprint is unchanged and running `computation` otherwise.
    ///
    /// Verbosity follows the stash's settings.
    pub fn resolve<T, F>(
        &self,
        key: &CacheKey,
        computation: Computation<F>,
        depends_on: &[String],
        scope: &Scope,
    ) -> Result<Resolved<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut ChildScope<'_>) -> Result<T, BoxError>,
    {
        self.resolve_with(key, computation, depends_on, scope, self.config.verbose)
    }

    fn resolve_with<T, F>(
        &self,
        key: &CacheKey,
        computation: Computation<F>,
        depends_on: &[String],
        scope: &Scope,
        verbose: bool,
    ) -> Result<Resolved<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut ChildScope<'_>) -> Result<T, BoxError>,
    {
        let canonical = self.canonicalizer.canonicalize(&computation.code);
        if canonical.trim().is_empty() {
            return Err(CacheError::EmptyComputation);
        }
        let current = FingerprintBuilder::new(&*self.canonicalizer).build(
            &canonical,
            depends_on,
            scope,
        )?;

        let values = self.values::<T>();
        let status = if !self.contains(key) {
            EntryStatus::Stored
        } else {
            match self.fingerprints.read(key)? {
                Some(prior) if prior.is_equivalent(&current) => match values.read(key)? {
                    Some(value) => {
                        report(verbose, key, EntryStatus::Loaded);
                        return Ok(Resolved {
                            value,
                            status: EntryStatus::Loaded,
                        });
                    }
                    None => EntryStatus::Updated,
                },
                Some(prior) => {
                    debug!(
                        "stash `{key}` changed in: {}",
                        prior.changed_components(&current).join(", ")
                    );
                    EntryStatus::Updated
                }
                None => EntryStatus::Updated,
            }
        };

        report(verbose, key, status);
        let mut child = scope.child();
        let value = (computation.body)(&mut child).map_err(|source| CacheError::Computation {
            key: key.to_string(),
            source,
        })?;

        // Fingerprint first: a crash before the value lands leaves an
        // incomplete entry, which reads as not stashed.
        self.fingerprints.write(key, &current)?;
        values.write(key, &value)?;

        Ok(Resolved { value, status })
    }

    /// Reads the stored fingerprint for `key`.
    pub fn fingerprint(&self, key: &CacheKey) -> Result<Option<Fingerprint>, CacheError> {
        self.fingerprints.read(key)
    }

    /// Lists keys with a complete entry.
    pub fn keys(&self) -> Result<Vec<CacheKey>, CacheError> {
        let fingerprints = scan_keys(&self.root, FINGERPRINT_EXT)?;
        let values = scan_keys(&self.root, VALUE_EXT)?;
        Ok(fingerprints.intersection(&values).cloned().collect())
    }

    /// Removes the entry stored under `key`.
    ///
    /// Accepts an identifier, a derived `0x…` key, or the original structured
    /// key. Returns `false` if nothing was stored.
    pub fn unstash(&self, key: impl Into<StashKey>) -> Result<bool, CacheError> {
        let key = key::locate(&key.into())?;
        let removed_fingerprint = self.fingerprints.remove(&key)?;
        let removed_value = self.values::<()>().remove(&key)?;
        let removed = removed_fingerprint || removed_value;
        if removed {
            info!("removed stash `{key}`");
        }
        Ok(removed)
    }

    /// Removes every entry under the root, including incomplete ones.
    ///
    /// Returns the number of keys removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut keys = scan_keys(&self.root, FINGERPRINT_EXT)?;
        keys.extend(scan_keys(&self.root, VALUE_EXT)?);

        let values = self.values::<()>();
        for key in &keys {
            self.fingerprints.remove(key)?;
            values.remove(key)?;
        }
        info!("cleared {} stash entries from {}", keys.len(), self.root.display());
        Ok(keys.len())
    }

    fn values<T>(&self) -> ValueStore<T> {
        ValueStore::new(&self.root)
    }
}

fn report(verbose: bool, key: &CacheKey, status: EntryStatus) {
    if verbose {
        info!("{} `{key}`", status.message());
    } else {
        debug!("{} `{key}`", status.message());
    }
}
