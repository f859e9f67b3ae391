//! In-memory session state
//!
//! Token material lives only in memory for the lifetime of the page
//! context; the shared storage area holds nothing but the boolean login
//! flag. Tokens are wrapped in [`Secret`] so session state can be logged
//! without leaking them.

use std::time::{SystemTime, UNIX_EPOCH};

use common::Secret;
use oidc_protocol::{ProfileClaims, TokenSet};

/// Tokens held for the current session.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: Secret<String>,
    pub refresh_token: Option<Secret<String>>,
    /// Absolute expiry as unix milliseconds, when the provider reported one.
    /// Informational — renewal is driven by callers, not by a timer.
    pub expires_at: Option<u64>,
}

impl From<TokenSet> for SessionTokens {
    fn from(tokens: TokenSet) -> Self {
        let expires_at = tokens.expires_in.map(|delta| now_millis() + delta * 1000);
        Self {
            access_token: Secret::new(tokens.access_token),
            refresh_token: tokens.refresh_token.map(Secret::new),
            expires_at,
        }
    }
}

/// The current user's session: tokens plus the profile claims captured at
/// login time.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub tokens: SessionTokens,
    pub profile: ProfileClaims,
}

impl SessionState {
    pub fn new(tokens: TokenSet, profile: ProfileClaims) -> Self {
        Self {
            tokens: tokens.into(),
            profile,
        }
    }

    /// Replace the session's tokens after a renewal. The profile captured
    /// at login stays — renewal responses carry no fresh claims worth
    /// trusting over the originals.
    pub fn update_tokens(&mut self, tokens: TokenSet) {
        self.tokens = tokens.into();
    }
}

/// Display name claims handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub given_name: String,
    pub family_name: String,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_set(access: &str, refresh: Option<&str>) -> TokenSet {
        TokenSet {
            access_token: access.into(),
            refresh_token: refresh.map(str::to_owned),
            id_token: None,
            expires_in: Some(3600),
        }
    }

    #[test]
    fn token_set_converts_with_absolute_expiry() {
        let before = now_millis();
        let tokens: SessionTokens = token_set("at_1", Some("rt_1")).into();
        assert_eq!(tokens.access_token.expose(), "at_1");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|t| t.expose().clone()),
            Some("rt_1".to_owned())
        );
        let expires_at = tokens.expires_at.unwrap();
        assert!(
            expires_at >= before + 3_600_000,
            "expiry must be an absolute future timestamp, got {expires_at}"
        );
    }

    #[test]
    fn missing_expiry_stays_none() {
        let mut set = token_set("at_1", None);
        set.expires_in = None;
        let tokens: SessionTokens = set.into();
        assert!(tokens.expires_at.is_none());
    }

    #[test]
    fn update_tokens_preserves_profile() {
        let profile = ProfileClaims {
            given_name: Some("Ada".into()),
            family_name: Some("Lovelace".into()),
            ..Default::default()
        };
        let mut session = SessionState::new(token_set("at_1", None), profile);
        session.update_tokens(token_set("at_2", None));
        assert_eq!(session.tokens.access_token.expose(), "at_2");
        assert_eq!(session.profile.given_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let session = SessionState::new(token_set("at_secret", Some("rt_secret")), Default::default());
        let debug = format!("{session:?}");
        assert!(!debug.contains("at_secret"), "leaked access token: {debug}");
        assert!(!debug.contains("rt_secret"), "leaked refresh token: {debug}");
    }
}
