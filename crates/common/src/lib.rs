//! Shared plumbing for the authentication workspace
//!
//! Holds the pieces every other crate needs: the redacting [`Secret`]
//! wrapper for token material, the [`KeyValueStore`] abstraction over the
//! tab-shareable browser storage area, and the common error type used by
//! configuration loading and storage implementations.

pub mod error;
pub mod secret;
pub mod store;

pub use error::{Error, Result};
pub use secret::Secret;
pub use store::{KeyValueStore, MemoryStore};
