//! Fingerprints: ordered digests of a computation's code and dependencies.
//!
//! A [`Fingerprint`] always starts with the `CODE` component, followed by one
//! component per declared dependency in lexicographic order. Two fingerprints
//! are equivalent only if their component sequences match exactly, so adding
//! or removing a dependency always invalidates a stash even when every shared
//! digest still matches.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use stash_common::ContentHash;

use crate::canon::Canonicalizer;
use crate::error::CacheError;
use crate::scope::{Binding, Lookup};

/// Name of the first fingerprint component, holding the code digest.
pub const CODE_COMPONENT: &str = "CODE";

const DATA_TAG: &str = "data";
const FUNCTION_TAG: &str = "function";
const CODE_TAG: &str = "code";

/// One named digest within a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// `CODE` or the dependency name.
    pub name: String,
    /// Digest of the code or the dependency's value.
    pub digest: ContentHash,
}

/// Ordered digest summary of a computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    components: Vec<Component>,
}

impl Fingerprint {
    /// All components, `CODE` first.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Digest of the canonical code.
    pub fn code_digest(&self) -> Option<&ContentHash> {
        self.components
            .first()
            .filter(|c| c.name == CODE_COMPONENT)
            .map(|c| &c.digest)
    }

    /// Dependency names in fingerprint order.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().skip(1).map(|c| c.name.as_str())
    }

    /// Structural equivalence: same names, same order, same digests.
    pub fn is_equivalent(&self, other: &Fingerprint) -> bool {
        self == other
    }

    /// Names of components that differ between `self` and `other`.
    ///
    /// Includes components present on only one side. Sorted, with `CODE`
    /// first when it changed.
    pub fn changed_components(&self, other: &Fingerprint) -> Vec<String> {
        let mut changed: BTreeSet<&str> = BTreeSet::new();
        for component in &self.components {
            let matches = other
                .components
                .iter()
                .any(|o| o.name == component.name && o.digest == component.digest);
            if !matches {
                changed.insert(&component.name);
            }
        }
        for component in &other.components {
            if !self.components.iter().any(|c| c.name == component.name) {
                changed.insert(&component.name);
            }
        }

        let code_changed = changed.remove(CODE_COMPONENT);
        let mut names: Vec<String> = Vec::with_capacity(changed.len() + 1);
        if code_changed {
            names.push(CODE_COMPONENT.to_string());
        }
        names.extend(changed.into_iter().map(str::to_string));
        names
    }
}

/// Builds fingerprints from canonical code and a scope.
///
/// Function-valued dependencies are canonicalized with the same
/// [`Canonicalizer`] as the code before being digested.
pub struct FingerprintBuilder<'c> {
    canonicalizer: &'c dyn Canonicalizer,
}

impl<'c> FingerprintBuilder<'c> {
    /// Creates a builder that canonicalizes function sources with `canonicalizer`.
    pub fn new(canonicalizer: &'c dyn Canonicalizer) -> Self {
        Self { canonicalizer }
    }

    /// Computes the fingerprint for `canonical_code` and its dependencies.
    ///
    /// Fails with [`CacheError::DuplicateDependency`] if a name is declared
    /// twice and with [`CacheError::MissingDependency`] (listing every
    /// unresolved name) if any name is unbound in `scope`. Performs no I/O.
    pub fn build(
        &self,
        canonical_code: &str,
        dependency_names: &[String],
        scope: &impl Lookup,
    ) -> Result<Fingerprint, CacheError> {
        let mut names: Vec<&str> = dependency_names.iter().map(String::as_str).collect();
        names.sort_unstable();

        let mut duplicates: Vec<String> = names
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .map(|pair| pair[0].to_string())
            .collect();
        if !duplicates.is_empty() {
            duplicates.dedup();
            return Err(CacheError::DuplicateDependency { names: duplicates });
        }

        let missing: Vec<String> = names
            .iter()
            .filter(|name| scope.lookup(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CacheError::MissingDependency { names: missing });
        }

        let mut components = Vec::with_capacity(names.len() + 1);
        components.push(Component {
            name: CODE_COMPONENT.to_string(),
            digest: ContentHash::from_tagged(CODE_TAG, canonical_code.as_bytes()),
        });
        for name in names {
            let binding = scope
                .lookup(name)
                .ok_or_else(|| CacheError::MissingDependency {
                    names: vec![name.to_string()],
                })?;
            components.push(Component {
                name: name.to_string(),
                digest: self.digest_binding(binding)?,
            });
        }

        Ok(Fingerprint { components })
    }

    /// Digests a single binding.
    ///
    /// Data is digested over its JSON encoding (object keys are sorted),
    /// functions over their canonical source.
    pub fn digest_binding(&self, binding: &Binding) -> Result<ContentHash, CacheError> {
        match binding {
            Binding::Data(value) => {
                let bytes = serde_json::to_vec(value).map_err(CacheError::serialization)?;
                Ok(ContentHash::from_tagged(DATA_TAG, &bytes))
            }
            Binding::Function { source } => {
                let canonical = self.canonicalizer.canonicalize(source);
                Ok(ContentHash::from_tagged(FUNCTION_TAG, canonical.as_bytes()))
            }
        }
    }
}
