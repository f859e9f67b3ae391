//! Provider metadata discovery
//!
//! Fetches `{authority}/.well-known/openid-configuration` and keeps the
//! handful of endpoints this client actually uses. Discovery runs lazily on
//! the first operation that needs an endpoint and the result is cached for
//! the lifetime of the client; a failed fetch surfaces on the operation that
//! triggered it (for a login start that means a login-request failure).

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Discovered provider endpoints.
///
/// `end_session_endpoint` is optional in the OIDC discovery document; a
/// provider without one cannot serve a standard logout redirect.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

/// Fetch the discovery document from the authority.
pub async fn fetch_metadata(client: &reqwest::Client, authority: &str) -> Result<ProviderMetadata> {
    let url = format!(
        "{}/.well-known/openid-configuration",
        authority.trim_end_matches('/')
    );

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Discovery(format!("metadata request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Discovery(format!(
            "metadata endpoint returned {status}"
        )));
    }

    let metadata = response
        .json::<ProviderMetadata>()
        .await
        .map_err(|e| Error::Discovery(format!("invalid metadata document: {e}")))?;

    debug!(authority, "discovered provider metadata");
    Ok(metadata)
}
