//! Protocol client trait and HTTP implementation
//!
//! [`ProtocolClient`] is the seam between the authentication coordinator and
//! the wire protocol: the coordinator decides *when* to log in, renew, and
//! log out; this client knows *how*. Tests substitute scripted
//! implementations; production uses [`HttpProtocolClient`].
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn ProtocolClient>`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use common::KeyValueStore;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::claims::{self, ProfileClaims};
use crate::discovery::{self, ProviderMetadata};
use crate::error::{Error, Result};
use crate::pkce;
use crate::query::{encode_component, query_param};
use crate::state::{self, RedirectState};
use crate::token::{self, TokenSet};

/// Immutable protocol configuration supplied at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Issuer base URL, e.g. `https://idp.example.com/realms/main`
    pub authority: String,
    pub client_id: String,
    /// Where the authorization server sends the login callback
    pub redirect_uri: String,
    /// Where the end-session endpoint sends the user after logout
    pub post_logout_redirect_uri: String,
    /// Space-separated scope string, e.g. `openid profile`
    pub scope: String,
}

/// Result of a completed authorization-code callback.
#[derive(Debug, Clone)]
pub struct CompletedLogin {
    pub tokens: TokenSet,
    pub profile: ProfileClaims,
    /// Application fragment captured when the login started
    pub return_fragment: Option<String>,
}

/// Protocol operations the coordinator depends on.
pub trait ProtocolClient: Send + Sync {
    /// Start a login: store opaque redirect state and return the
    /// authorization URL to navigate to.
    fn begin_login<'a>(
        &'a self,
        return_fragment: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Whether stored, non-expired redirect state exists for a callback's
    /// `state` parameter. Distinguishes our callback from unrelated queries.
    fn pending_state<'a>(
        &'a self,
        state_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Complete a login from the callback query string (no leading `?`).
    fn complete_login<'a>(
        &'a self,
        callback_query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompletedLogin>> + Send + 'a>>;

    /// Renew tokens with the refresh-token grant.
    fn renew_with_refresh_token<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenSet>> + Send + 'a>>;

    /// Renew tokens silently without showing login UI, relying on the
    /// provider's SSO cookie.
    fn renew_silent(&self) -> Pin<Box<dyn Future<Output = Result<TokenSet>> + Send + '_>>;

    /// Build the provider's standard end-session redirect URL.
    fn end_session_url(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

/// reqwest-backed protocol client.
///
/// Owns its HTTP client: redirects are never followed (the silent-renewal
/// flow inspects `Location` itself) and a cookie jar carries the provider's
/// SSO cookie between the login callback and later silent renewals.
pub struct HttpProtocolClient {
    config: ClientConfig,
    http: reqwest::Client,
    state_store: Arc<dyn KeyValueStore>,
    metadata: Mutex<Option<ProviderMetadata>>,
}

impl HttpProtocolClient {
    pub fn new(config: ClientConfig, state_store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            state_store,
            metadata: Mutex::new(None),
        })
    }

    /// Discover provider metadata, fetching on first use and caching after.
    async fn metadata(&self) -> Result<ProviderMetadata> {
        let mut cached = self.metadata.lock().await;
        if let Some(metadata) = cached.as_ref() {
            return Ok(metadata.clone());
        }
        let metadata = discovery::fetch_metadata(&self.http, &self.config.authority).await?;
        *cached = Some(metadata.clone());
        Ok(metadata)
    }

    /// Build the authorization URL for a fresh PKCE challenge.
    fn authorization_url(
        &self,
        authorization_endpoint: &str,
        challenge: &str,
        state_id: &str,
        silent: bool,
    ) -> String {
        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&code_challenge={}&code_challenge_method=S256&state={}",
            authorization_endpoint,
            encode_component(&self.config.client_id),
            encode_component(&self.config.redirect_uri),
            encode_component(&self.config.scope),
            challenge,
            state_id,
        );
        if silent {
            // The "do not show login UI" hint for hidden renewals
            url.push_str("&prompt=none");
        }
        url
    }

    /// Run the code exchange for a callback or silent-renewal redirect.
    async fn exchange(&self, code: &str, verifier: &str) -> Result<TokenSet> {
        let metadata = self.metadata().await?;
        token::exchange_code(
            &self.http,
            &metadata.token_endpoint,
            &self.config.client_id,
            &self.config.redirect_uri,
            code,
            verifier,
        )
        .await
    }
}

/// Provider error codes that mean "interactive login needed" on a
/// `prompt=none` request.
const INTERACTION_ERRORS: &[&str] = &["login_required", "interaction_required", "consent_required"];

impl ProtocolClient for HttpProtocolClient {
    fn begin_login<'a>(
        &'a self,
        return_fragment: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let metadata = self.metadata().await?;

            let state_id = uuid::Uuid::new_v4().simple().to_string();
            let verifier = pkce::generate_verifier();
            let challenge = pkce::compute_challenge(&verifier);

            let redirect_state =
                RedirectState::new(verifier, return_fragment.map(str::to_owned));
            state::save(self.state_store.as_ref(), &state_id, &redirect_state).await?;

            info!(state_id, "login initiated");
            Ok(self.authorization_url(
                &metadata.authorization_endpoint,
                &challenge,
                &state_id,
                false,
            ))
        })
    }

    fn pending_state<'a>(
        &'a self,
        state_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move { state::exists(self.state_store.as_ref(), state_id).await })
    }

    fn complete_login<'a>(
        &'a self,
        callback_query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompletedLogin>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(error) = query_param(callback_query, "error") {
                let description = query_param(callback_query, "error_description")
                    .unwrap_or_else(|| String::from("<no description>"));
                return Err(Error::Exchange(format!(
                    "authorization server returned {error}: {description}"
                )));
            }

            let state_id = query_param(callback_query, "state")
                .ok_or_else(|| Error::State("callback query has no state parameter".into()))?;
            let code = query_param(callback_query, "code")
                .ok_or_else(|| Error::InvalidResponse("callback query has no code".into()))?;

            let redirect_state = state::take(self.state_store.as_ref(), &state_id).await?;
            let tokens = self.exchange(&code, &redirect_state.verifier).await?;

            let profile = match tokens.id_token.as_deref() {
                Some(id_token) => claims::decode_unverified(id_token)?,
                None => ProfileClaims::default(),
            };

            info!(state_id, "login completed");
            Ok(CompletedLogin {
                tokens,
                profile,
                return_fragment: redirect_state.return_fragment,
            })
        })
    }

    fn renew_with_refresh_token<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TokenSet>> + Send + 'a>> {
        Box::pin(async move {
            let metadata = self.metadata().await?;
            token::refresh_grant(
                &self.http,
                &metadata.token_endpoint,
                &self.config.client_id,
                refresh_token,
            )
            .await
        })
    }

    fn renew_silent(&self) -> Pin<Box<dyn Future<Output = Result<TokenSet>> + Send + '_>> {
        Box::pin(async move {
            let metadata = self.metadata().await?;

            // Fresh PKCE pair per attempt; the verifier never leaves this
            // call so there is nothing to persist.
            let state_id = uuid::Uuid::new_v4().simple().to_string();
            let verifier = pkce::generate_verifier();
            let challenge = pkce::compute_challenge(&verifier);

            let url = self.authorization_url(
                &metadata.authorization_endpoint,
                &challenge,
                &state_id,
                true,
            );

            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::Http(format!("silent authorize request failed: {e}")))?;

            let status = response.status();
            if !status.is_redirection() {
                // The provider rendered a page instead of redirecting back:
                // no SSO session, interaction needed.
                return Err(Error::LoginRequired(format!(
                    "authorize endpoint answered {status} instead of redirecting"
                )));
            }

            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    Error::InvalidResponse("authorize redirect without Location header".into())
                })?;

            let query = location.split_once('?').map(|(_, q)| q).unwrap_or("");

            if let Some(error) = query_param(query, "error") {
                let description = query_param(query, "error_description")
                    .unwrap_or_else(|| String::from("<no description>"));
                if INTERACTION_ERRORS.contains(&error.as_str()) {
                    return Err(Error::LoginRequired(format!("{error}: {description}")));
                }
                return Err(Error::Exchange(format!(
                    "silent authorize returned {error}: {description}"
                )));
            }

            let code = query_param(query, "code").ok_or_else(|| {
                Error::InvalidResponse("silent authorize redirect carries no code".into())
            })?;

            debug!(state_id, "silent renewal authorized");
            self.exchange(&code, &verifier).await
        })
    }

    fn end_session_url(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move {
            let metadata = self.metadata().await?;
            let end_session = metadata.end_session_endpoint.ok_or_else(|| {
                Error::Discovery("provider metadata has no end_session_endpoint".into())
            })?;
            Ok(format!(
                "{}?client_id={}&post_logout_redirect_uri={}",
                end_session,
                encode_component(&self.config.client_id),
                encode_component(&self.config.post_logout_redirect_uri),
            ))
        })
    }
}
