//! Error types for stash operations.

use std::path::PathBuf;

use stash_config::ConfigError;

/// Boxed error returned by a computation body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while stashing.
///
/// Validation errors (`InvalidKey`, `MissingDependency`,
/// `DuplicateDependency`, `EmptyComputation`) are raised before any storage
/// access or computation. Corrupt artifacts are not errors: they read as a
/// cache miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The key is not a valid identifier and derived keys are not allowed.
    #[error("invalid stash key {key}: use an identifier, or functional mode for arbitrary keys")]
    InvalidKey {
        /// The rejected key, rendered as JSON.
        key: String,
    },

    /// One or more declared dependencies are not bound in the scope.
    #[error("missing dependencies: {}", names.join(", "))]
    MissingDependency {
        /// The unresolved names, sorted.
        names: Vec<String>,
    },

    /// The same dependency name was declared more than once.
    #[error("duplicate dependencies: {}", names.join(", "))]
    DuplicateDependency {
        /// The repeated names, sorted.
        names: Vec<String>,
    },

    /// The computation's code is empty after canonicalization.
    #[error("computation has no code to stash")]
    EmptyComputation,

    /// An I/O error occurred while reading or writing stash files.
    #[error("stash I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A value could not be serialized for storage or binding.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The computation body itself failed. Nothing was written.
    #[error("computation for `{key}` failed: {source}")]
    Computation {
        /// The cache key being computed.
        key: String,
        /// The error returned by the computation.
        source: BoxError,
    },

    /// Settings could not be loaded or the cache root could not be created.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(reason: impl ToString) -> Self {
        CacheError::Serialization {
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for errors raised before any storage access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CacheError::InvalidKey { .. }
                | CacheError::MissingDependency { .. }
                | CacheError::DuplicateDependency { .. }
                | CacheError::EmptyComputation
        )
    }
}
