//! Key-value storage abstraction
//!
//! The browser keeps the login flag and pending redirect state in a storage
//! area shared across tabs. [`KeyValueStore`] models that area as an explicit
//! interface so the coordinator and the protocol client can be tested
//! without a real browser, and so native hosts can plug in a file-backed
//! implementation.
//!
//! Any tab (or process) may mutate the store at any time; readers see
//! external changes on their next access. Implementations only need to make
//! individual operations atomic, not sequences of them.
//!
//! Methods return `Pin<Box<dyn Future>>` for dyn-compatibility
//! (`Arc<dyn KeyValueStore>`).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;

use crate::error::Result;

/// Shared string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// Write a value, replacing any existing one.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// In-memory store used by tests and as the default for a single page
/// context. A tokio Mutex serializes access so concurrent operations from
/// overlapping coordinator calls stay well-defined.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self.entries.lock().await;
            Ok(entries.get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            entries.insert(key.to_owned(), value.to_owned());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            entries.remove(key);
            Ok(())
        })
    }
}
