//! Error types for configuration loading and cache root resolution.

use std::path::PathBuf;

/// Errors that can occur when loading settings or preparing the cache root.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// An environment variable held a value that could not be interpreted.
    #[error("invalid value '{value}' for environment variable {var}")]
    InvalidEnv {
        /// The variable name.
        var: String,
        /// The rejected value.
        value: String,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The cache root directory does not exist and could not be created.
    #[error(
        "cannot create stash directory {path}: {source}; create it manually and try again"
    )]
    RootCreation {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
