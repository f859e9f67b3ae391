//! Configuration loading for login-check
//!
//! Config precedence: CLI `--config` > `CONFIG_PATH` env var > default
//! file name. The redirect URIs are derived from the listener port so a
//! checked provider only ever needs one loopback client registration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use auth_session::{AuthConfig, ProviderKind};
use oidc_protocol::ClientConfig;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub provider: ProviderSection,
    #[serde(default)]
    pub listener: ListenerSection,
    #[serde(default)]
    pub state: StateSection,
}

/// Authorization-server settings for the configuration under test
#[derive(Debug, Deserialize)]
pub struct ProviderSection {
    pub authority: String,
    pub client_id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    pub kind: ProviderKind,
    /// Manually built logout endpoint, required for `kind = "cognito"`
    #[serde(default)]
    pub logout_endpoint: Option<String>,
}

/// Loopback callback listener settings
#[derive(Debug, Deserialize)]
pub struct ListenerSection {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where the run keeps its shared-storage file
#[derive(Debug, Deserialize)]
pub struct StateSection {
    #[serde(default = "default_state_file")]
    pub file: PathBuf,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            file: default_state_file(),
        }
    }
}

fn default_scope() -> String {
    "openid profile".into()
}

fn default_port() -> u16 {
    4200
}

fn default_state_file() -> PathBuf {
    PathBuf::from("login-check-state.json")
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        if !config.provider.authority.starts_with("http://")
            && !config.provider.authority.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "authority must start with http:// or https://, got: {}",
                config.provider.authority
            )));
        }

        if config.provider.client_id.is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        config.auth_config().validate()?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("login-check.toml")
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.listener.port)
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.listener.port)
    }

    pub fn post_logout_redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/logged-out", self.listener.port)
    }

    /// Build the coordinator configuration for this run.
    pub fn auth_config(&self) -> AuthConfig {
        let client = ClientConfig {
            authority: self.provider.authority.clone(),
            client_id: self.provider.client_id.clone(),
            redirect_uri: self.redirect_uri(),
            post_logout_redirect_uri: self.post_logout_redirect_uri(),
            scope: self.provider.scope.clone(),
        };
        let mut config = AuthConfig::new(client, self.provider.kind);
        if let Some(endpoint) = &self.provider.logout_endpoint {
            config = config.with_custom_logout_endpoint(endpoint.clone());
        }
        config
    }
}
