//! Token endpoint interactions
//!
//! Handles the two grants this client performs against the token endpoint:
//! 1. Authorization-code exchange (login completion, with PKCE verifier)
//! 2. Refresh-token grant (silent renewal for providers that allow it)
//!
//! Both POST form-encoded bodies to the discovered token endpoint. The
//! public client never sends a secret; PKCE replaces it for the code
//! exchange.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Token endpoint response for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time; the session
/// layer converts it to an absolute timestamp when storing. Refresh and ID
/// tokens are optional — providers omit them depending on grant and scopes,
/// and refresh responses routinely carry no new refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Exchange an authorization code for tokens (login completion).
///
/// The code arrived on the redirect URI; the verifier comes from the stored
/// redirect state and proves we initiated the flow.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    code: &str,
    verifier: &str,
) -> Result<TokenSet> {
    let response = client
        .post(token_endpoint)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Exchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenSet>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("invalid token response: {e}")))
}

/// Renew tokens with a refresh-token grant.
///
/// A rejected refresh token (revoked, rotated away, or the server-side
/// session is gone) classifies as `SessionExpired` so the caller can treat
/// it as the expected end of a session rather than a failure.
pub async fn refresh_grant(
    client: &reqwest::Client,
    token_endpoint: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<TokenSet> {
    let response = client
        .post(token_endpoint)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // invalid_grant and auth failures mean the session is gone
        if status.as_u16() == 401
            || status.as_u16() == 403
            || (status.as_u16() == 400 && body.contains("invalid_grant"))
        {
            return Err(Error::SessionExpired(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::Exchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenSet>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("invalid refresh response: {e}")))
}
