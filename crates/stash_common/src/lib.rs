//! Shared foundational types for the stash memoization cache.
//!
//! This crate provides the content digest used for fingerprints and derived
//! keys, and the identifier syntax check shared by key validation and scopes.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;

pub use hash::{ContentHash, ParseHashError};
pub use ident::is_identifier;
