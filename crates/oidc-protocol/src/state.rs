//! Opaque redirect state for in-flight logins
//!
//! Between the redirect to the authorization server and the callback, the
//! client must remember the PKCE verifier and the application fragment to
//! restore. Both are stored in the shared key-value store under a generated
//! state identifier that travels through the provider unchanged; the
//! callback's `state` parameter keys the lookup. Entries expire so an
//! abandoned login cannot leave a verifier behind indefinitely.

use std::time::{SystemTime, UNIX_EPOCH};

use common::KeyValueStore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum age of stored redirect state before it expires.
const STATE_EXPIRY_SECS: u64 = 600; // 10 minutes

const STATE_KEY_PREFIX: &str = "oidc.state.";

/// Persisted per-login state, keyed by the `state` parameter value.
#[derive(Debug, Serialize, Deserialize)]
pub struct RedirectState {
    pub verifier: String,
    /// Application fragment to restore after the callback completes
    pub return_fragment: Option<String>,
    /// Unix timestamp in milliseconds at creation
    pub created_at: u64,
}

impl RedirectState {
    pub fn new(verifier: String, return_fragment: Option<String>) -> Self {
        Self {
            verifier,
            return_fragment,
            created_at: now_millis(),
        }
    }

    fn expired(&self) -> bool {
        now_millis().saturating_sub(self.created_at) > STATE_EXPIRY_SECS * 1000
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn storage_key(state_id: &str) -> String {
    format!("{STATE_KEY_PREFIX}{state_id}")
}

/// Persist redirect state under the given identifier.
pub async fn save(store: &dyn KeyValueStore, state_id: &str, state: &RedirectState) -> Result<()> {
    let json = serde_json::to_string(state)
        .map_err(|e| Error::State(format!("serializing redirect state: {e}")))?;
    store
        .set(&storage_key(state_id), &json)
        .await
        .map_err(|e| Error::State(format!("persisting redirect state: {e}")))
}

/// Whether non-expired redirect state exists for the identifier.
pub async fn exists(store: &dyn KeyValueStore, state_id: &str) -> Result<bool> {
    let raw = store
        .get(&storage_key(state_id))
        .await
        .map_err(|e| Error::State(format!("reading redirect state: {e}")))?;
    match raw {
        Some(json) => {
            let state: RedirectState = serde_json::from_str(&json)
                .map_err(|e| Error::State(format!("corrupt redirect state: {e}")))?;
            Ok(!state.expired())
        }
        None => Ok(false),
    }
}

/// Load and remove redirect state. One-shot: a second take for the same
/// identifier fails, which also defeats callback replays.
pub async fn take(store: &dyn KeyValueStore, state_id: &str) -> Result<RedirectState> {
    let key = storage_key(state_id);
    let raw = store
        .get(&key)
        .await
        .map_err(|e| Error::State(format!("reading redirect state: {e}")))?
        .ok_or_else(|| Error::State(format!("no pending login for state {state_id}")))?;

    store
        .remove(&key)
        .await
        .map_err(|e| Error::State(format!("removing redirect state: {e}")))?;

    let state: RedirectState = serde_json::from_str(&raw)
        .map_err(|e| Error::State(format!("corrupt redirect state: {e}")))?;

    if state.expired() {
        return Err(Error::State(format!(
            "login state for {state_id} expired, restart the login"
        )));
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::MemoryStore;

    #[tokio::test]
    async fn save_exists_take_roundtrip() {
        let store = MemoryStore::new();
        let state = RedirectState::new("verifier-1".into(), Some("/companies".into()));
        save(&store, "st-1", &state).await.unwrap();

        assert!(exists(&store, "st-1").await.unwrap());

        let taken = take(&store, "st-1").await.unwrap();
        assert_eq!(taken.verifier, "verifier-1");
        assert_eq!(taken.return_fragment.as_deref(), Some("/companies"));
    }

    #[tokio::test]
    async fn take_is_one_shot() {
        let store = MemoryStore::new();
        let state = RedirectState::new("verifier-1".into(), None);
        save(&store, "st-1", &state).await.unwrap();

        take(&store, "st-1").await.unwrap();
        let second = take(&store, "st-1").await;
        assert!(matches!(second, Err(Error::State(_))));
    }

    #[tokio::test]
    async fn unknown_state_does_not_exist() {
        let store = MemoryStore::new();
        assert!(!exists(&store, "st-unknown").await.unwrap());
        assert!(matches!(
            take(&store, "st-unknown").await,
            Err(Error::State(_))
        ));
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let store = MemoryStore::new();
        let state = RedirectState {
            verifier: "verifier-old".into(),
            return_fragment: None,
            created_at: now_millis() - (STATE_EXPIRY_SECS * 1000 + 1),
        };
        save(&store, "st-old", &state).await.unwrap();

        assert!(!exists(&store, "st-old").await.unwrap());
        assert!(matches!(take(&store, "st-old").await, Err(Error::State(_))));
    }
}
