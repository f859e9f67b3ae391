//! Coordinator error taxonomy
//!
//! Four lifecycle failures, each wrapping its protocol-level cause and
//! carrying a stable machine-readable code for the error view. The
//! expected, recoverable outcomes of silent renewal (login required /
//! session expired) never appear here — they are handled inside the
//! coordinator by clearing the session.

use thiserror::Error;

/// An API authorization failure observed by the caller, handed to
/// `start_login` so the redirect-loop guard can re-raise it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API request rejected with status {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Failures surfaced to callers of the coordinator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login request failed: {0}")]
    LoginRequest(#[source] oidc_protocol::Error),

    #[error("login response handling failed: {0}")]
    LoginResponse(#[source] oidc_protocol::Error),

    #[error("logout request failed: {0}")]
    LogoutRequest(#[source] oidc_protocol::Error),

    #[error("token renewal failed: {0}")]
    TokenRenewal(#[source] oidc_protocol::Error),

    /// A prior API error re-raised by the redirect-loop guard instead of
    /// starting another login redirect.
    #[error("{0}")]
    Api(ApiError),
}

impl AuthError {
    /// Stable machine-readable code for rendering and telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::LoginRequest(_) => "login_request_failed",
            AuthError::LoginResponse(_) => "login_response_failed",
            AuthError::LogoutRequest(_) => "logout_request_failed",
            AuthError::TokenRenewal(_) => "token_renewal_failed",
            AuthError::Api(_) => "api_unauthorized",
        }
    }
}
