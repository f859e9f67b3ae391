//! Session authentication coordinator
//!
//! Owns the application's token state and sequences the OpenID Connect
//! login lifecycle: interactive login via full-page redirect, silent
//! renewal through one of two provider strategies, logout with cross-tab
//! notification, and a guard against redirect loops caused by broken
//! provider configurations.
//!
//! The browser environment is injected through small traits — storage
//! ([`common::KeyValueStore`]), navigation ([`browser::Navigator`]), and
//! cross-tab signalling ([`browser::LogoutBroadcast`]) — so the coordinator
//! runs unchanged in tests and native hosts.

pub mod browser;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod renewal;
pub mod session;

pub use browser::{ChannelBroadcast, LogoutBroadcast, LogoutSignal, Navigator, StubNavigator};
pub use config::{AuthConfig, ProviderKind};
pub use coordinator::{Authenticator, spawn_logout_listener};
pub use error::{ApiError, AuthError};
pub use session::{SessionState, SessionTokens, UserInfo};
