//! OpenID Connect protocol client
//!
//! Implements the protocol side of the Authorization Code flow with PKCE
//! that the authentication coordinator orchestrates: endpoint discovery,
//! login initiation with opaque redirect state, authorization-code callback
//! completion, silent renewal (refresh-token grant or headless
//! `prompt=none` authorize), and end-session URL construction.
//!
//! The crate deliberately stops short of token validation — ID-token claims
//! are decoded without signature verification and consumed as display data
//! only. Callers that need verified claims must validate downstream.
//!
//! Flow:
//! 1. Coordinator calls [`ProtocolClient::begin_login`] and redirects to the
//!    returned URL
//! 2. The authorization server calls back with `code` + `state`
//! 3. Coordinator passes the callback query to
//!    [`ProtocolClient::complete_login`]
//! 4. Later renewals go through [`ProtocolClient::renew_with_refresh_token`]
//!    or [`ProtocolClient::renew_silent`]

pub mod claims;
pub mod client;
pub mod discovery;
pub mod error;
pub mod pkce;
pub mod query;
pub mod state;
pub mod token;

pub use claims::ProfileClaims;
pub use client::{ClientConfig, CompletedLogin, HttpProtocolClient, ProtocolClient};
pub use discovery::ProviderMetadata;
pub use error::{Error, FailureKind, Result};
pub use pkce::{compute_challenge, generate_verifier};
pub use query::{encode_component, query_param};
pub use token::TokenSet;
