//! Silent renewal strategies
//!
//! Two interchangeable ways to obtain a fresh access token without user
//! interaction, selected once from the provider kind at construction. Each
//! strategy folds the protocol failures it expects into a
//! [`RenewalOutcome`]; anything it does not expect propagates as an error
//! for the coordinator to wrap.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use oidc_protocol::{Error as ProtocolError, FailureKind, ProtocolClient, TokenSet};
use tracing::debug;

use crate::config::ProviderKind;

/// Outcome of a silent renewal attempt.
///
/// `LoginRequired` and `SessionExpired` are expected ends of a session; the
/// coordinator clears state and reports "no token" rather than an error.
#[derive(Debug)]
pub enum RenewalOutcome {
    Renewed(TokenSet),
    LoginRequired,
    SessionExpired,
}

/// A way to renew the session's access token without showing login UI.
pub trait RenewalStrategy: Send + Sync {
    /// Identifier for logging.
    fn id(&self) -> &'static str;

    /// Attempt a renewal. `refresh_token` is the session's stored refresh
    /// token, if any; strategies that renew through the provider's SSO
    /// cookie ignore it.
    fn renew<'a>(
        &'a self,
        refresh_token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<RenewalOutcome, ProtocolError>> + Send + 'a>>;
}

/// Select the renewal strategy for a provider kind.
pub fn strategy_for(
    kind: ProviderKind,
    protocol: Arc<dyn ProtocolClient>,
) -> Box<dyn RenewalStrategy> {
    match kind {
        ProviderKind::Cognito => Box::new(RefreshGrantRenewal { protocol }),
        ProviderKind::Standard => Box::new(HiddenFrameRenewal { protocol }),
    }
}

/// Refresh-token grant renewal, for providers whose SameSite cookie policy
/// breaks hidden-frame renewal.
pub struct RefreshGrantRenewal {
    protocol: Arc<dyn ProtocolClient>,
}

impl RenewalStrategy for RefreshGrantRenewal {
    fn id(&self) -> &'static str {
        "refresh_grant"
    }

    fn renew<'a>(
        &'a self,
        refresh_token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<RenewalOutcome, ProtocolError>> + Send + 'a>> {
        Box::pin(async move {
            let Some(refresh_token) = refresh_token else {
                // No refresh token stored: nothing to renew with, the user
                // has to log in interactively
                debug!("no refresh token in session, renewal needs interactive login");
                return Ok(RenewalOutcome::LoginRequired);
            };
            match self.protocol.renew_with_refresh_token(refresh_token).await {
                Ok(tokens) => Ok(RenewalOutcome::Renewed(tokens)),
                Err(e) if e.kind() == FailureKind::SessionExpired => {
                    debug!(error = %e, "refresh token rejected, session over");
                    Ok(RenewalOutcome::SessionExpired)
                }
                Err(e) => Err(e),
            }
        })
    }
}

/// Hidden same-origin redirect renewal carrying the "do not show login UI"
/// hint, relying on the provider's SSO cookie.
pub struct HiddenFrameRenewal {
    protocol: Arc<dyn ProtocolClient>,
}

impl RenewalStrategy for HiddenFrameRenewal {
    fn id(&self) -> &'static str {
        "hidden_frame"
    }

    fn renew<'a>(
        &'a self,
        _refresh_token: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<RenewalOutcome, ProtocolError>> + Send + 'a>> {
        Box::pin(async move {
            match self.protocol.renew_silent().await {
                Ok(tokens) => Ok(RenewalOutcome::Renewed(tokens)),
                Err(e) if e.kind() == FailureKind::LoginRequired => {
                    debug!(error = %e, "no SSO session at the provider");
                    Ok(RenewalOutcome::LoginRequired)
                }
                Err(e) => Err(e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use oidc_protocol::{CompletedLogin, Result as ProtocolResult};

    /// Scripted protocol client: queues of canned renewal results.
    #[derive(Default)]
    struct ScriptedProtocol {
        refresh_results: Mutex<VecDeque<ProtocolResult<TokenSet>>>,
        silent_results: Mutex<VecDeque<ProtocolResult<TokenSet>>>,
    }

    impl ScriptedProtocol {
        fn with_refresh(result: ProtocolResult<TokenSet>) -> Arc<Self> {
            let scripted = Self::default();
            scripted.refresh_results.lock().unwrap().push_back(result);
            Arc::new(scripted)
        }

        fn with_silent(result: ProtocolResult<TokenSet>) -> Arc<Self> {
            let scripted = Self::default();
            scripted.silent_results.lock().unwrap().push_back(result);
            Arc::new(scripted)
        }
    }

    fn tokens(access: &str) -> TokenSet {
        TokenSet {
            access_token: access.into(),
            refresh_token: Some("rt_next".into()),
            id_token: None,
            expires_in: Some(3600),
        }
    }

    impl ProtocolClient for ScriptedProtocol {
        fn begin_login<'a>(
            &'a self,
            _return_fragment: Option<&'a str>,
        ) -> Pin<Box<dyn Future<Output = ProtocolResult<String>> + Send + 'a>> {
            unimplemented!("not used by renewal strategies")
        }

        fn pending_state<'a>(
            &'a self,
            _state_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = ProtocolResult<bool>> + Send + 'a>> {
            unimplemented!("not used by renewal strategies")
        }

        fn complete_login<'a>(
            &'a self,
            _callback_query: &'a str,
        ) -> Pin<Box<dyn Future<Output = ProtocolResult<CompletedLogin>> + Send + 'a>> {
            unimplemented!("not used by renewal strategies")
        }

        fn renew_with_refresh_token<'a>(
            &'a self,
            _refresh_token: &'a str,
        ) -> Pin<Box<dyn Future<Output = ProtocolResult<TokenSet>> + Send + 'a>> {
            Box::pin(async move {
                self.refresh_results
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("unexpected refresh-grant call")
            })
        }

        fn renew_silent(
            &self,
        ) -> Pin<Box<dyn Future<Output = ProtocolResult<TokenSet>> + Send + '_>> {
            Box::pin(async move {
                self.silent_results
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("unexpected silent-renewal call")
            })
        }

        fn end_session_url(
            &self,
        ) -> Pin<Box<dyn Future<Output = ProtocolResult<String>> + Send + '_>> {
            unimplemented!("not used by renewal strategies")
        }
    }

    #[test]
    fn strategy_selection_follows_provider_kind() {
        let protocol: Arc<dyn ProtocolClient> = Arc::new(ScriptedProtocol::default());
        assert_eq!(
            strategy_for(ProviderKind::Cognito, protocol.clone()).id(),
            "refresh_grant"
        );
        assert_eq!(
            strategy_for(ProviderKind::Standard, protocol).id(),
            "hidden_frame"
        );
    }

    #[tokio::test]
    async fn refresh_grant_renews_with_stored_token() {
        let protocol = ScriptedProtocol::with_refresh(Ok(tokens("at_new")));
        let strategy = RefreshGrantRenewal { protocol };
        let outcome = strategy.renew(Some("rt_current")).await.unwrap();
        match outcome {
            RenewalOutcome::Renewed(t) => assert_eq!(t.access_token, "at_new"),
            other => panic!("expected Renewed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_grant_without_token_requires_login() {
        let protocol = Arc::new(ScriptedProtocol::default());
        let strategy = RefreshGrantRenewal { protocol };
        let outcome = strategy.renew(None).await.unwrap();
        assert!(matches!(outcome, RenewalOutcome::LoginRequired));
    }

    #[tokio::test]
    async fn refresh_grant_folds_session_expiry() {
        let protocol = ScriptedProtocol::with_refresh(Err(ProtocolError::SessionExpired(
            "invalid_grant".into(),
        )));
        let strategy = RefreshGrantRenewal { protocol };
        let outcome = strategy.renew(Some("rt_revoked")).await.unwrap();
        assert!(matches!(outcome, RenewalOutcome::SessionExpired));
    }

    #[tokio::test]
    async fn refresh_grant_propagates_unexpected_failures() {
        let protocol =
            ScriptedProtocol::with_refresh(Err(ProtocolError::Http("connection reset".into())));
        let strategy = RefreshGrantRenewal { protocol };
        let result = strategy.renew(Some("rt_current")).await;
        assert!(matches!(result, Err(ProtocolError::Http(_))));
    }

    #[tokio::test]
    async fn hidden_frame_renews_via_sso_cookie() {
        let protocol = ScriptedProtocol::with_silent(Ok(tokens("at_new")));
        let strategy = HiddenFrameRenewal { protocol };
        let outcome = strategy.renew(None).await.unwrap();
        assert!(matches!(outcome, RenewalOutcome::Renewed(_)));
    }

    #[tokio::test]
    async fn hidden_frame_folds_login_required() {
        let protocol = ScriptedProtocol::with_silent(Err(ProtocolError::LoginRequired(
            "no SSO cookie".into(),
        )));
        let strategy = HiddenFrameRenewal { protocol };
        let outcome = strategy.renew(None).await.unwrap();
        assert!(matches!(outcome, RenewalOutcome::LoginRequired));
    }

    #[tokio::test]
    async fn hidden_frame_propagates_unexpected_failures() {
        let protocol =
            ScriptedProtocol::with_silent(Err(ProtocolError::Exchange("500 from token".into())));
        let strategy = HiddenFrameRenewal { protocol };
        let result = strategy.renew(None).await;
        assert!(matches!(result, Err(ProtocolError::Exchange(_))));
    }
}
