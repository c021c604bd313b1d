//! Settings loading: defaults, then `stash.toml`, then environment.

use crate::error::ConfigError;
use crate::types::{RootStrategy, StashConfig};
use std::path::Path;
use tracing::debug;

/// Name of the optional settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "stash.toml";

/// Overrides the `functional` default.
pub const ENV_FUNCTIONAL: &str = "STASH_FUNCTIONAL";
/// Overrides the `verbose` default.
pub const ENV_VERBOSE: &str = "STASH_VERBOSE";
/// Overrides the root strategy (`fixed` or `project`).
pub const ENV_ROOT: &str = "STASH_ROOT";
/// Overrides the cache directory name.
pub const ENV_DIR: &str = "STASH_DIR";

/// Loads the complete settings object for a working directory.
///
/// Reads `<dir>/stash.toml` when present and applies `STASH_*` environment
/// variables on top.
pub fn load_settings(dir: &Path) -> Result<StashConfig, ConfigError> {
    let mut config = load_config(dir)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads `<dir>/stash.toml`, or the defaults if the file does not exist.
pub fn load_config(dir: &Path) -> Result<StashConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.is_file() {
        debug!("no {} in {}, using defaults", CONFIG_FILE, dir.display());
        return Ok(StashConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates settings from a TOML string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<StashConfig, ConfigError> {
    let config: StashConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Applies environment overrides using `lookup` to read variables.
///
/// Unset variables leave the corresponding field untouched.
pub fn apply_env_overrides<F>(config: &mut StashConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_FUNCTIONAL) {
        config.functional = parse_flag(ENV_FUNCTIONAL, &value)?;
    }
    if let Some(value) = lookup(ENV_VERBOSE) {
        config.verbose = parse_flag(ENV_VERBOSE, &value)?;
    }
    if let Some(value) = lookup(ENV_ROOT) {
        config.root = value
            .parse::<RootStrategy>()
            .map_err(|_| invalid_env(ENV_ROOT, &value))?;
    }
    if let Some(value) = lookup(ENV_DIR) {
        config.dir_name = value;
    }
    Ok(())
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(var, value)),
    }
}

fn invalid_env(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    }
}

/// The directory name must be a single path segment.
fn validate_config(config: &StashConfig) -> Result<(), ConfigError> {
    let name = config.dir_name.as_str();
    if name.is_empty() {
        return Err(ConfigError::ValidationError(
            "dir_name must not be empty".to_string(),
        ));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "dir_name '{name}' must be a single directory name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
functional = true
verbose = false
root = "project"
dir_name = ".cache-stash"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.functional);
        assert!(!config.verbose);
        assert_eq!(config.root, RootStrategy::Project);
        assert_eq!(config.dir_name, ".cache-stash");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, StashConfig::default());
    }

    #[test]
    fn unknown_field_errors() {
        let err = load_config_from_str("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn dir_name_with_separator_errors() {
        let err = load_config_from_str("dir_name = \"a/b\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        let err = load_config_from_str("dir_name = \"..\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config, StashConfig::default());
    }

    #[test]
    fn reads_file_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "verbose = false\n").unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(!config.verbose);
        assert!(!config.functional);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = load_config_from_str("functional = false\nverbose = true").unwrap();
        let vars = env(&[
            (ENV_FUNCTIONAL, "yes"),
            (ENV_VERBOSE, "0"),
            (ENV_ROOT, "Project"),
            (ENV_DIR, ".memo"),
        ]);
        apply_env_overrides(&mut config, |name| vars.get(name).cloned()).unwrap();
        assert!(config.functional);
        assert!(!config.verbose);
        assert_eq!(config.root, RootStrategy::Project);
        assert_eq!(config.dir_name, ".memo");
    }

    #[test]
    fn unset_env_leaves_config_alone() {
        let mut config = StashConfig::default();
        apply_env_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config, StashConfig::default());
    }

    #[test]
    fn bad_env_flag_errors() {
        let mut config = StashConfig::default();
        let vars = env(&[(ENV_VERBOSE, "sometimes")]);
        let err = apply_env_overrides(&mut config, |name| vars.get(name).cloned()).unwrap_err();
        match err {
            ConfigError::InvalidEnv { var, value } => {
                assert_eq!(var, ENV_VERBOSE);
                assert_eq!(value, "sometimes");
            }
            other => panic!("expected InvalidEnv, got {other:?}"),
        }
    }

    #[test]
    fn bad_env_root_errors() {
        let mut config = StashConfig::default();
        let vars = env(&[(ENV_ROOT, "somewhere")]);
        let err = apply_env_overrides(&mut config, |name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }
}
