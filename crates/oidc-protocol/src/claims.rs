//! Unverified ID-token claim extraction
//!
//! The profile claims shown in the application (greeting, account menu) come
//! from the ID token issued at login. This module decodes the JWT payload
//! without verifying its signature — the token was received over TLS
//! directly from the token endpoint, and nothing security-relevant is
//! derived from these claims. Resource servers validate the access token
//! independently.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Profile claims carried in the ID-token payload.
///
/// All fields are optional: providers only emit what the requested scopes
/// and their user directory contain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Decode the payload segment of a JWT into [`ProfileClaims`].
///
/// No signature check — see the module docs. Unknown claims are ignored.
pub fn decode_unverified(id_token: &str) -> Result<ProfileClaims> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_header), Some(payload)) => payload,
        _ => {
            return Err(Error::InvalidResponse(
                "ID token is not a three-segment JWT".into(),
            ));
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| Error::InvalidResponse(format!("ID token payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidResponse(format!("ID token payload is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a structurally valid JWT with the given payload JSON and a
    /// nonsense signature, the way a test provider would.
    fn fake_jwt(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{header}.{body}.sig-not-checked")
    }

    #[test]
    fn decodes_profile_claims() {
        let token = fake_jwt(
            r#"{"sub":"user-1","given_name":"Ada","family_name":"Lovelace","email":"ada@example.com","iss":"https://idp.example.com"}"#,
        );
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.given_name.as_deref(), Some("Ada"));
        assert_eq!(claims.family_name.as_deref(), Some("Lovelace"));
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn missing_claims_decode_to_none() {
        let token = fake_jwt(r#"{"sub":"user-2"}"#);
        let claims = decode_unverified(&token).unwrap();
        assert!(claims.given_name.is_none());
        assert!(claims.family_name.is_none());
    }

    #[test]
    fn rejects_non_jwt_input() {
        assert!(decode_unverified("not-a-jwt").is_err());
    }

    #[test]
    fn rejects_non_json_payload() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = URL_SAFE_NO_PAD.encode(b"plain text");
        let token = format!("{header}.{body}.sig");
        assert!(decode_unverified(&token).is_err());
    }
}
