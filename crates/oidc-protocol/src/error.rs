//! Error types and failure classification for protocol operations
//!
//! The coordinator only cares about three outcomes of a failed protocol
//! call: the user has to log in again interactively, the session is gone on
//! the server side, or something unexpected broke. [`FailureKind`] collapses
//! the error surface to exactly that contract.

/// Errors from protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("provider metadata discovery failed: {0}")]
    Discovery(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("redirect state error: {0}")]
    State(String),

    #[error("login required: {0}")]
    LoginRequired(String),

    #[error("session expired: {0}")]
    SessionExpired(String),
}

/// Classification of a protocol failure for renewal decisions.
///
/// `LoginRequired` and `SessionExpired` are expected, recoverable outcomes
/// of silent renewal: the caller clears its session and falls back to an
/// interactive login. `Other` is everything that should surface to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No SSO session on the provider side; interactive login needed
    LoginRequired,
    /// Refresh token revoked or the server-side session is gone
    SessionExpired,
    /// Transport, discovery, or malformed-response failures
    Other,
}

impl Error {
    /// Classify this failure for the coordinator's renewal handling.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::LoginRequired(_) => FailureKind::LoginRequired,
            Error::SessionExpired(_) => FailureKind::SessionExpired,
            _ => FailureKind::Other,
        }
    }
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_required_classifies_as_recoverable() {
        let err = Error::LoginRequired("no SSO cookie".into());
        assert_eq!(err.kind(), FailureKind::LoginRequired);
    }

    #[test]
    fn session_expired_classifies_as_recoverable() {
        let err = Error::SessionExpired("invalid_grant".into());
        assert_eq!(err.kind(), FailureKind::SessionExpired);
    }

    #[test]
    fn transport_failures_classify_as_other() {
        for err in [
            Error::Http("connection refused".into()),
            Error::Discovery("404".into()),
            Error::Exchange("500".into()),
            Error::InvalidResponse("not json".into()),
            Error::State("missing".into()),
        ] {
            assert_eq!(err.kind(), FailureKind::Other, "misclassified: {err}");
        }
    }

    #[test]
    fn display_includes_cause() {
        let err = Error::Exchange("token endpoint returned 500".into());
        assert!(err.to_string().contains("token endpoint returned 500"));
    }
}
