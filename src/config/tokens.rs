//! Capability token configuration.

use serde::Deserialize;

use super::types::{ValidationError, decode_key};

/// Capability token settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TokensConfig {
    /// Base64-encoded HMAC-SHA256 key (at least 32 bytes decoded). Prefer
    /// the SHAREGATE_TOKEN_AUTHENTICATION_KEY environment variable.
    #[serde(default)]
    pub authentication_key: String,
    /// Day window for tokens scoped to a single album.
    #[serde(default = "default_per_album_validity_days")]
    pub per_album_validity_days: u32,
    /// Day window for global tokens (empty entitlement).
    #[serde(default = "default_global_validity_days")]
    pub global_validity_days: u32,
}

impl TokensConfig {
    /// Decoded HMAC authentication key.
    pub fn authentication_key_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        decode_key("tokens.authentication_key", &self.authentication_key, 32)
    }
}

fn default_per_album_validity_days() -> u32 {
    15
}

fn default_global_validity_days() -> u32 {
    7
}
