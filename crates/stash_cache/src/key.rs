//! Cache key validation and derivation.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use stash_common::{is_identifier, ContentHash};

use crate::error::CacheError;

/// Prefix of derived keys. Starts with a digit, so a derived key can never
/// collide with an identifier.
pub const DERIVED_PREFIX: &str = "0x";

const KEY_TAG: &str = "key";

/// A key as proposed by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum StashKey {
    /// A plain name, ideally an identifier.
    Named(String),
    /// Any serializable value.
    Structured(Value),
}

impl StashKey {
    /// Builds a structured key from any serializable value.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self, CacheError> {
        serde_json::to_value(value)
            .map(StashKey::Structured)
            .map_err(CacheError::serialization)
    }

    /// The key's structural content as JSON.
    fn to_value(&self) -> Value {
        match self {
            StashKey::Named(name) => Value::String(name.clone()),
            StashKey::Structured(value) => value.clone(),
        }
    }

    /// The key as a single name, if it is one.
    fn as_name(&self) -> Option<&str> {
        match self {
            StashKey::Named(name) => Some(name),
            StashKey::Structured(Value::String(name)) => Some(name),
            StashKey::Structured(_) => None,
        }
    }
}

impl From<&str> for StashKey {
    fn from(name: &str) -> Self {
        StashKey::Named(name.to_string())
    }
}

impl From<String> for StashKey {
    fn from(name: String) -> Self {
        StashKey::Named(name)
    }
}

impl From<Value> for StashKey {
    fn from(value: Value) -> Self {
        StashKey::Structured(value)
    }
}

/// A validated key, safe to use as a file name segment.
///
/// Keys compare case-sensitively, so `R1` and `r1` are distinct keys. Their
/// artifact files (`R1.value`, `r1.value`) are not distinct on
/// case-insensitive filesystems such as the macOS and Windows defaults, where
/// such keys overwrite each other's entries. Derived keys are lowercase hex
/// and never collide this way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Parses an already-validated key: an identifier, or a derived key.
    pub fn parse(s: &str) -> Option<Self> {
        if is_identifier(s) || is_derived_key(s) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this key was derived by hashing.
    pub fn is_derived(&self) -> bool {
        is_derived_key(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_derived_key(s: &str) -> bool {
    s.strip_prefix(DERIVED_PREFIX)
        .is_some_and(|hex| hex.parse::<ContentHash>().is_ok())
}

/// Validates a proposed key.
///
/// A single name that is a valid identifier is returned unchanged. Anything
/// else is hashed over its structural content when `allow_derived` is set,
/// and rejected with [`CacheError::InvalidKey`] otherwise.
pub fn validate(key: &StashKey, allow_derived: bool) -> Result<CacheKey, CacheError> {
    if let Some(name) = key.as_name().filter(|name| is_identifier(name)) {
        return Ok(CacheKey(name.to_string()));
    }

    let value = key.to_value();
    let encoded = serde_json::to_vec(&value).map_err(CacheError::serialization)?;
    if !allow_derived {
        return Err(CacheError::InvalidKey {
            key: String::from_utf8_lossy(&encoded).into_owned(),
        });
    }

    let digest = ContentHash::from_tagged(KEY_TAG, &encoded);
    Ok(CacheKey(format!("{DERIVED_PREFIX}{digest}")))
}

/// Finds the cache key an existing entry is stored under.
///
/// Unlike [`validate`], text that already is a cache key (including a
/// previously derived `0x…` key) is taken as-is. Anything else is derived.
pub fn locate(key: &StashKey) -> Result<CacheKey, CacheError> {
    if let Some(found) = key.as_name().and_then(CacheKey::parse) {
        return Ok(found);
    }
    validate(key, true)
}
