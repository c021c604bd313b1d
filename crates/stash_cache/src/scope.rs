//! Explicit evaluation scopes.
//!
//! Dependencies are looked up by name in a [`Scope`] supplied by the caller.
//! Computations run against a [`ChildScope`], which reads through to its
//! parent but keeps its own writes local, so incidental bindings never leak
//! back into the caller's scope.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CacheError;

/// A value bound to a name in a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Plain data, held as JSON.
    Data(Value),
    /// A function, represented by its source text.
    ///
    /// Functions are fingerprinted over their canonical source, so two
    /// functions with identical code hash identically.
    Function {
        /// The function's source definition.
        source: String,
    },
}

impl Binding {
    /// Serializes `value` into a data binding.
    pub fn data<T: Serialize + ?Sized>(value: &T) -> Result<Self, CacheError> {
        serde_json::to_value(value)
            .map(Binding::Data)
            .map_err(CacheError::serialization)
    }

    /// Creates a function binding from its source text.
    pub fn function(source: impl Into<String>) -> Self {
        Binding::Function {
            source: source.into(),
        }
    }

    /// Returns the JSON value of a data binding.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Binding::Data(value) => Some(value),
            Binding::Function { .. } => None,
        }
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Binding::Data(value)
    }
}

/// Lookup by name, shared by [`Scope`] and [`ChildScope`].
pub trait Lookup {
    /// Returns the binding for `name`, if any.
    fn lookup(&self, name: &str) -> Option<&Binding>;

    /// Deserializes the data bound to `name`.
    ///
    /// Returns `Ok(None)` if the name is unbound or bound to a function.
    fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CacheError> {
        match self.lookup(name).and_then(Binding::as_data) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(CacheError::serialization),
            None => Ok(None),
        }
    }
}

/// A caller-owned symbol table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: BTreeMap<String, Binding>,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any previous binding.
    pub fn set(&mut self, name: impl Into<String>, binding: impl Into<Binding>) {
        self.bindings.insert(name.into(), binding.into());
    }

    /// Serializes `value` and binds it to `name`.
    pub fn set_value<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), CacheError> {
        self.set(name, Binding::data(value)?);
        Ok(())
    }

    /// Binds a function's source text to `name`.
    pub fn set_function(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.set(name, Binding::function(source));
    }

    /// Removes and returns the binding for `name`.
    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        self.bindings.remove(name)
    }

    /// Returns `true` if `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Iterates over the bound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Opens an isolated child scope for running a computation.
    pub fn child(&self) -> ChildScope<'_> {
        ChildScope {
            parent: self,
            locals: BTreeMap::new(),
        }
    }
}

impl Lookup for Scope {
    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }
}

/// A scope layered over a parent: reads fall through, writes stay local.
#[derive(Debug)]
pub struct ChildScope<'a> {
    parent: &'a Scope,
    locals: BTreeMap<String, Binding>,
}

impl ChildScope<'_> {
    /// Binds `name` locally, shadowing the parent.
    pub fn set(&mut self, name: impl Into<String>, binding: impl Into<Binding>) {
        self.locals.insert(name.into(), binding.into());
    }

    /// Serializes `value` and binds it locally.
    pub fn set_value<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), CacheError> {
        self.set(name, Binding::data(value)?);
        Ok(())
    }

    /// Names bound locally, in sorted order.
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.locals.keys().map(String::as_str)
    }
}

impl Lookup for ChildScope<'_> {
    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.locals.get(name).or_else(|| self.parent.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get_value() {
        let mut scope = Scope::new();
        scope.set_value("dep", &5).unwrap();
        assert_eq!(scope.get_as::<i64>("dep").unwrap(), Some(5));
        assert!(scope.contains("dep"));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn get_as_unbound_is_none() {
        let scope = Scope::new();
        assert_eq!(scope.get_as::<i64>("nope").unwrap(), None);
    }

    #[test]
    fn get_as_wrong_type_errors() {
        let mut scope = Scope::new();
        scope.set("s", json!("text"));
        assert!(scope.get_as::<i64>("s").is_err());
    }

    #[test]
    fn function_binding_has_no_data() {
        let mut scope = Scope::new();
        scope.set_function("f", "fn f(x) { x + 1 }");
        assert!(scope.lookup("f").unwrap().as_data().is_none());
        assert_eq!(scope.get_as::<i64>("f").unwrap(), None);
    }

    #[test]
    fn child_reads_parent() {
        let mut scope = Scope::new();
        scope.set_value("dep", &5).unwrap();
        let child = scope.child();
        assert_eq!(child.get_as::<i64>("dep").unwrap(), Some(5));
    }

    #[test]
    fn child_writes_do_not_leak() {
        let mut scope = Scope::new();
        scope.set_value("dep", &5).unwrap();
        {
            let mut child = scope.child();
            child.set_value("tmp", &1).unwrap();
            child.set_value("dep", &99).unwrap();
            assert_eq!(child.get_as::<i64>("dep").unwrap(), Some(99));
            assert_eq!(child.local_names().collect::<Vec<_>>(), vec!["dep", "tmp"]);
        }
        assert!(!scope.contains("tmp"));
        assert_eq!(scope.get_as::<i64>("dep").unwrap(), Some(5));
    }

    #[test]
    fn names_are_sorted() {
        let mut scope = Scope::new();
        scope.set("b", json!(1));
        scope.set("a", json!(2));
        assert_eq!(scope.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn remove_binding() {
        let mut scope = Scope::new();
        scope.set("x", json!(1));
        assert!(scope.remove("x").is_some());
        assert!(scope.is_empty());
    }
}
