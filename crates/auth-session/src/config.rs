//! Coordinator configuration
//!
//! Immutable after construction. The provider kind selects the silent
//! renewal strategy once, at build time; nothing branches on provider at
//! runtime beyond logout URL construction.

use std::time::Duration;

use oidc_protocol::ClientConfig;
use serde::Deserialize;

/// Authorization-server families with different renewal behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Standard OIDC provider: silent renewal runs through a hidden
    /// same-origin redirect carrying `prompt=none`.
    Standard,
    /// AWS Cognito: its SSO cookies are SameSite-restricted, which breaks
    /// hidden-frame renewal, so renewal uses the refresh-token grant and
    /// logout needs a manually built URL.
    Cognito,
}

/// How soon after a completed login a reported API 401 counts as a
/// renewal that "succeeds" without fixing anything — the redirect-loop
/// signature.
pub const DEFAULT_REDIRECT_LOOP_WINDOW: Duration = Duration::from_secs(1);

/// Immutable coordinator configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client: ClientConfig,
    pub provider: ProviderKind,
    /// Logout endpoint for providers whose end-session URL must be built
    /// manually (Cognito). Ignored for standard providers.
    pub custom_logout_endpoint: Option<String>,
    /// Injectable for tests; production uses the default.
    pub redirect_loop_window: Duration,
}

impl AuthConfig {
    pub fn new(client: ClientConfig, provider: ProviderKind) -> Self {
        Self {
            client,
            provider,
            custom_logout_endpoint: None,
            redirect_loop_window: DEFAULT_REDIRECT_LOOP_WINDOW,
        }
    }

    pub fn with_custom_logout_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.custom_logout_endpoint = Some(endpoint.into());
        self
    }

    /// Validate cross-field constraints before wiring the coordinator.
    pub fn validate(&self) -> common::Result<()> {
        if self.provider == ProviderKind::Cognito && self.custom_logout_endpoint.is_none() {
            return Err(common::Error::Config(
                "cognito provider requires a custom logout endpoint".into(),
            ));
        }
        Ok(())
    }
}
