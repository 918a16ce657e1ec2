//! OpenID Connect provider configuration.

use serde::Deserialize;

/// OIDC provider settings for the browser login flow.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcConfig {
    /// Issuer URL used for provider discovery
    /// (e.g., "https://accounts.google.com").
    pub issuer_url: String,
    /// OAuth2 client id registered with the provider.
    pub client_id: String,
    /// OAuth2 client secret. Prefer supplying it through the
    /// SHAREGATE_OIDC_CLIENT_SECRET environment variable over the file.
    #[serde(default)]
    pub client_secret: String,
    /// Scopes requested at the authorization endpoint. "openid" is always
    /// requested even when absent here.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// When non-empty, only identities whose hosted-domain claim matches may
    /// log in.
    #[serde(default)]
    pub allowed_domain: String,
    /// Timeout in seconds for provider HTTP calls (discovery, code exchange).
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "email".to_string()]
}

fn default_http_timeout_secs() -> u64 {
    10
}
