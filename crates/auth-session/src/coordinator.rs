//! Authentication coordinator
//!
//! Sequences the session lifecycle: interactive login via full-page
//! redirect, callback completion, silent renewal through the configured
//! strategy, logout with cross-tab notification, and the redirect-loop
//! guard. Holds the only mutable state in the crate — the in-memory
//! session and the last-login timestamp — behind a tokio Mutex that is
//! never held across a protocol call.
//!
//! Concurrency note: overlapping renewal attempts are not serialized.
//! Two concurrent `get_access_token` calls before a refresh completes can
//! both reach the provider; the last writer wins. The page context this
//! models is single-threaded and the source behaved the same way.

use std::sync::Arc;
use std::time::Instant;

use common::{KeyValueStore, Secret};
use oidc_protocol::{ProtocolClient, TokenSet, encode_component, query_param};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::{LogoutBroadcast, Navigator};
use crate::config::{AuthConfig, ProviderKind};
use crate::error::{ApiError, AuthError};
use crate::renewal::{RenewalOutcome, RenewalStrategy, strategy_for};
use crate::session::{SessionState, UserInfo};

/// Storage key for the cross-tab login flag.
const LOGIN_FLAG_KEY: &str = "session.logged-in";

/// Mutable coordinator state.
#[derive(Default)]
struct Inner {
    session: Option<SessionState>,
    /// When the last login completed; drives the redirect-loop guard only
    last_login: Option<Instant>,
}

/// The authentication coordinator.
pub struct Authenticator {
    config: AuthConfig,
    protocol: Arc<dyn ProtocolClient>,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    broadcast: Arc<dyn LogoutBroadcast>,
    strategy: Box<dyn RenewalStrategy>,
    inner: Mutex<Inner>,
}

impl Authenticator {
    pub fn new(
        config: AuthConfig,
        protocol: Arc<dyn ProtocolClient>,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        broadcast: Arc<dyn LogoutBroadcast>,
    ) -> Self {
        let strategy = strategy_for(config.provider, protocol.clone());
        info!(
            provider = ?config.provider,
            strategy = strategy.id(),
            "authenticator initialized"
        );
        Self {
            config,
            protocol,
            store,
            navigator,
            broadcast,
            strategy,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Current access token, renewing silently if none is held.
    ///
    /// No side effect when a token is already present.
    pub async fn get_access_token(&self) -> Result<Option<String>, AuthError> {
        {
            let inner = self.inner.lock().await;
            if let Some(session) = inner.session.as_ref() {
                return Ok(Some(session.tokens.access_token.expose_cloned()));
            }
        }
        self.refresh_access_token().await
    }

    /// Attempt a silent renewal through the configured strategy.
    ///
    /// A no-op unless the persisted login flag is set — a first page load
    /// must not hit the provider. Expected renewal outcomes (login
    /// required, session expired) clear all session state and return
    /// `Ok(None)`; unexpected failures surface as [`AuthError::TokenRenewal`]
    /// with the session untouched.
    pub async fn refresh_access_token(&self) -> Result<Option<String>, AuthError> {
        if !self.is_logged_in().await {
            debug!("no persisted login, skipping renewal");
            return Ok(None);
        }

        let refresh_token = {
            let inner = self.inner.lock().await;
            inner
                .session
                .as_ref()
                .and_then(|s| s.tokens.refresh_token.as_ref())
                .map(|t| t.expose_cloned())
        };

        match self.strategy.renew(refresh_token.as_deref()).await {
            Ok(RenewalOutcome::Renewed(tokens)) => {
                let tokens = self.sanitize_tokens(tokens);
                let access_token = tokens.access_token.clone();
                let mut inner = self.inner.lock().await;
                match inner.session.as_mut() {
                    Some(session) => session.update_tokens(tokens),
                    // Flag was set but this context held no session (e.g. a
                    // freshly opened tab): the renewal bootstraps one,
                    // profile claims arrive on the next interactive login
                    None => inner.session = Some(SessionState::new(tokens, Default::default())),
                }
                info!(strategy = self.strategy.id(), "access token renewed");
                Ok(Some(access_token))
            }
            Ok(RenewalOutcome::LoginRequired) => {
                info!("silent renewal needs interactive login, clearing session");
                self.clear_login_state().await;
                Ok(None)
            }
            Ok(RenewalOutcome::SessionExpired) => {
                info!("session expired at the provider, clearing session");
                self.clear_login_state().await;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, strategy = self.strategy.id(), "token renewal failed");
                Err(AuthError::TokenRenewal(e))
            }
        }
    }

    /// Begin an interactive login with a full-page redirect.
    ///
    /// `prior_api_error` is the 401 that made the caller decide to
    /// re-authenticate, if any; the redirect-loop guard may re-raise it
    /// instead of redirecting.
    pub async fn start_login(&self, prior_api_error: Option<ApiError>) -> Result<(), AuthError> {
        self.check_redirect_loop(prior_api_error).await?;

        let fragment = self.navigator.fragment();
        let url = self
            .protocol
            .begin_login(fragment.as_deref())
            .await
            .map_err(AuthError::LoginRequest)?;

        info!("redirecting to authorization server");
        self.navigator.redirect(&url);
        Ok(())
    }

    /// Process a potential login callback. Call on every page load.
    ///
    /// Returns `Ok(false)` when the current query is not a callback of
    /// ours: no `state` parameter, or no matching stored redirect state
    /// (an unrelated query string must not trigger an exchange). When a
    /// callback is recognized, the OAuth response parameters are scrubbed
    /// from the URL and history whether or not the exchange succeeds.
    pub async fn handle_login_response(&self) -> Result<bool, AuthError> {
        let Some(query) = self.navigator.query().filter(|q| !q.is_empty()) else {
            return Ok(false);
        };
        let Some(state_id) = query_param(&query, "state") else {
            return Ok(false);
        };
        if !self
            .protocol
            .pending_state(&state_id)
            .await
            .map_err(AuthError::LoginResponse)?
        {
            debug!(state_id, "state parameter without a pending login, ignoring query");
            return Ok(false);
        }

        let result = self.complete_login(&query).await;
        // Scrub runs on the failure path too: the code and state must not
        // survive in the visible URL or in back-navigation
        self.navigator.strip_query();
        result.map(|()| true)
    }

    async fn complete_login(&self, query: &str) -> Result<(), AuthError> {
        let completed = self
            .protocol
            .complete_login(query)
            .await
            .map_err(AuthError::LoginResponse)?;

        let tokens = self.sanitize_tokens(completed.tokens);
        {
            let mut inner = self.inner.lock().await;
            inner.session = Some(SessionState::new(tokens, completed.profile));
            inner.last_login = Some(Instant::now());
        }
        self.persist_flag(true).await;
        self.navigator
            .set_fragment(completed.return_fragment.as_deref().unwrap_or("/"));

        info!("login completed");
        Ok(())
    }

    /// Log out: clear state, notify other tabs, redirect to the provider's
    /// end-session endpoint.
    pub async fn start_logout(&self) -> Result<(), AuthError> {
        self.clear_login_state().await;
        self.broadcast.publish();

        let url = match self.config.provider {
            ProviderKind::Cognito => {
                // Cognito has no usable end_session_endpoint in its
                // discovery document; the logout URL is built by hand
                let endpoint = self.config.custom_logout_endpoint.as_deref().ok_or_else(|| {
                    AuthError::LogoutRequest(oidc_protocol::Error::Discovery(
                        "no custom logout endpoint configured for this provider".into(),
                    ))
                })?;
                format!(
                    "{}?client_id={}&logout_uri={}",
                    endpoint,
                    encode_component(&self.config.client.client_id),
                    encode_component(&self.config.client.post_logout_redirect_uri),
                )
            }
            ProviderKind::Standard => self
                .protocol
                .end_session_url()
                .await
                .map_err(AuthError::LogoutRequest)?,
        };

        info!("redirecting to end-session endpoint");
        self.navigator.redirect(&url);
        Ok(())
    }

    /// Another tab logged out: drop local state, no navigation.
    pub async fn on_external_logout(&self) {
        info!("logout signalled from another tab, clearing local session");
        self.clear_login_state().await;
    }

    /// Display claims from the session profile; `None` unless both names
    /// are present. Never a network call — the profile was captured at
    /// login.
    pub async fn get_user_info(&self) -> Option<UserInfo> {
        let inner = self.inner.lock().await;
        let profile = &inner.session.as_ref()?.profile;
        match (&profile.given_name, &profile.family_name) {
            (Some(given_name), Some(family_name)) => Some(UserInfo {
                given_name: given_name.clone(),
                family_name: family_name.clone(),
            }),
            _ => None,
        }
    }

    /// Drop the session, the login timestamp, and the persisted flag.
    /// Idempotent.
    pub async fn clear_login_state(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.session = None;
            inner.last_login = None;
        }
        self.persist_flag(false).await;
    }

    /// Test support: corrupt the stored access token's signature so
    /// downstream validation rejects it. Everything else stays intact.
    pub async fn expire_access_token(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.session.as_mut() {
            let mut token = session.tokens.access_token.expose_cloned();
            token.push('x');
            session.tokens.access_token = Secret::new(token);
        }
    }

    /// Whether the cross-tab login flag is set. Unreadable storage counts
    /// as logged out.
    pub async fn is_logged_in(&self) -> bool {
        match self.store.get(LOGIN_FLAG_KEY).await {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "login flag unreadable, treating as logged out");
                false
            }
        }
    }

    /// Redirect-loop guard: a 401 arriving within the loop window of a
    /// completed login means renewal "succeeds" without fixing the 401 —
    /// a misconfiguration signature. Clear state and re-raise the original
    /// error instead of redirecting forever.
    async fn check_redirect_loop(&self, prior: Option<ApiError>) -> Result<(), AuthError> {
        let Some(prior) = prior else {
            return Ok(());
        };
        let just_logged_in = {
            let inner = self.inner.lock().await;
            inner
                .last_login
                .map(|at| at.elapsed() < self.config.redirect_loop_window)
                .unwrap_or(false)
        };
        if just_logged_in {
            warn!(
                status = prior.status,
                "API rejected a token right after login, breaking redirect loop"
            );
            self.clear_login_state().await;
            return Err(AuthError::Api(prior));
        }
        Ok(())
    }

    /// Drop refresh tokens for providers that renew through the hidden
    /// frame — they are never persisted there, on any path.
    fn sanitize_tokens(&self, mut tokens: TokenSet) -> TokenSet {
        if self.config.provider != ProviderKind::Cognito && tokens.refresh_token.take().is_some() {
            debug!("discarding refresh token from provider response");
        }
        tokens
    }

    /// Write the cross-tab login flag. Storage failures are logged and
    /// swallowed — the in-memory session stays authoritative and the next
    /// flag read falls back to logged-out.
    async fn persist_flag(&self, logged_in: bool) {
        let value = if logged_in { "true" } else { "false" };
        if let Err(e) = self.store.set(LOGIN_FLAG_KEY, value).await {
            warn!(error = %e, value, "failed to persist login flag");
        }
    }
}

/// Wire a broadcast subscription to [`Authenticator::on_external_logout`]
/// as a background task. The publishing context receives its own signal;
/// clearing twice is harmless.
pub fn spawn_logout_listener(auth: Arc<Authenticator>) -> tokio::task::JoinHandle<()> {
    let mut receiver = auth.broadcast.subscribe();
    tokio::spawn(async move {
        while receiver.recv().await.is_ok() {
            auth.on_external_logout().await;
        }
    })
}
