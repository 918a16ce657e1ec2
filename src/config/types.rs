//! Core configuration types and loading.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::oidc::OidcConfig;
use super::session::SessionConfig;
use super::tokens::TokensConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.public_url must be an absolute http(s) URL, got '{0}'")]
    InvalidPublicUrl(String),
    #[error("upstream.url must be an absolute http(s) URL, got '{0}'")]
    InvalidUpstreamUrl(String),
    #[error("oidc.issuer_url is required")]
    MissingIssuerUrl,
    #[error("oidc.client_id is required")]
    MissingClientId,
    #[error("oidc.client_secret is required")]
    MissingClientSecret,
    #[error("{name} is not valid base64: {source}")]
    KeyNotBase64 {
        name: &'static str,
        source: base64::DecodeError,
    },
    #[error("{name} must be at least {min} bytes, got {len}")]
    KeyTooShort {
        name: &'static str,
        min: usize,
        len: usize,
    },
    #[error("session.encryption_key must be exactly 32 bytes, got {0}")]
    EncryptionKeyLength(usize),
}

/// Gate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and listeners.
    pub server: ServerConfig,
    /// Wrapped application the gate forwards to.
    pub upstream: UpstreamConfig,
    /// OIDC provider settings for the browser login flow.
    pub oidc: OidcConfig,
    /// Sealed session cookie settings.
    pub session: SessionConfig,
    /// Capability token settings.
    pub tokens: TokensConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Secret values may be supplied through the environment instead of the
    /// file: `SHAREGATE_OIDC_CLIENT_SECRET`,
    /// `SHAREGATE_SESSION_AUTHENTICATION_KEY`,
    /// `SHAREGATE_SESSION_ENCRYPTION_KEY` and
    /// `SHAREGATE_TOKEN_AUTHENTICATION_KEY` override their config-file
    /// counterparts.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("SHAREGATE_OIDC_CLIENT_SECRET") {
            self.oidc.client_secret = value;
        }
        if let Ok(value) = std::env::var("SHAREGATE_SESSION_AUTHENTICATION_KEY") {
            self.session.authentication_key = value;
        }
        if let Ok(value) = std::env::var("SHAREGATE_SESSION_ENCRYPTION_KEY") {
            self.session.encryption_key = value;
        }
        if let Ok(value) = std::env::var("SHAREGATE_TOKEN_AUTHENTICATION_KEY") {
            self.tokens.authentication_key = value;
        }
    }

    /// Check cross-field and key-material requirements.
    ///
    /// The daemon refuses to start on any failure here rather than serving
    /// with unusable keys or an unreachable provider.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_http_url(&self.server.public_url) {
            return Err(ValidationError::InvalidPublicUrl(
                self.server.public_url.clone(),
            ));
        }
        if !is_http_url(&self.upstream.url) {
            return Err(ValidationError::InvalidUpstreamUrl(
                self.upstream.url.clone(),
            ));
        }
        if self.oidc.issuer_url.is_empty() {
            return Err(ValidationError::MissingIssuerUrl);
        }
        if self.oidc.client_id.is_empty() {
            return Err(ValidationError::MissingClientId);
        }
        if self.oidc.client_secret.is_empty() {
            return Err(ValidationError::MissingClientSecret);
        }
        self.session.authentication_key_bytes()?;
        self.session.encryption_key_bytes()?;
        self.tokens.authentication_key_bytes()?;
        Ok(())
    }

    /// Redirect URI registered with the OIDC provider.
    ///
    /// The public URL with its path replaced by `/oauth/callback` and any
    /// query or fragment stripped. A URL without a scheme is returned as-is.
    pub fn callback_url(&self) -> String {
        let url = &self.server.public_url;
        let Some(host_start) = url.find("://").map(|i| i + 3) else {
            return url.clone();
        };
        let host_end = url[host_start..]
            .find(['/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);
        format!("{}/oauth/callback", &url[..host_end])
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the gate listens on.
    pub listen: SocketAddr,
    /// Public base URL recipients reach the gate at.
    pub public_url: String,
    /// Prometheus metrics HTTP port (default: 9090). 0 disables.
    pub metrics_port: Option<u16>,
    /// First path segments that require a browser login.
    #[serde(default = "default_protected_roots")]
    pub protected_roots: Vec<String>,
}

/// Wrapped application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to after authentication.
    pub url: String,
}

fn default_protected_roots() -> Vec<String> {
    vec!["album".to_string()]
}

pub(crate) fn default_true() -> bool {
    true
}

/// Decode a base64 key from the config, enforcing a length floor.
pub(crate) fn decode_key(
    name: &'static str,
    encoded: &str,
    min_len: usize,
) -> Result<Vec<u8>, ValidationError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|source| ValidationError::KeyNotBase64 { name, source })?;
    if bytes.len() < min_len {
        return Err(ValidationError::KeyTooShort {
            name,
            min: min_len,
            len: bytes.len(),
        });
    }
    Ok(bytes)
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    rest.is_some_and(|r| !r.is_empty())
}
