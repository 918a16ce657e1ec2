//! Session cookie configuration.

use serde::Deserialize;

use super::types::{ValidationError, decode_key, default_true};

/// Sealed session cookie settings.
///
/// The session round-trips entirely through the client-held cookie; there is
/// no server-side session table. Two independent keys seal it: an HMAC
/// authentication key and an AEAD encryption key.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Base64-encoded HMAC-SHA256 key (at least 32 bytes decoded). Prefer
    /// the SHAREGATE_SESSION_AUTHENTICATION_KEY environment variable.
    #[serde(default)]
    pub authentication_key: String,
    /// Base64-encoded ChaCha20-Poly1305 key (exactly 32 bytes decoded).
    /// Prefer the SHAREGATE_SESSION_ENCRYPTION_KEY environment variable.
    #[serde(default)]
    pub encryption_key: String,
    /// Cookie name.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime in seconds, enforced both as the cookie Max-Age and
    /// against the sealed issue timestamp.
    #[serde(default = "default_cookie_max_age_secs")]
    pub cookie_max_age_secs: u32,
    /// Set the Secure attribute on cookies. Disable only for plain-HTTP
    /// development setups.
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
}

impl SessionConfig {
    /// Decoded HMAC authentication key.
    pub fn authentication_key_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        decode_key("session.authentication_key", &self.authentication_key, 32)
    }

    /// Decoded AEAD encryption key.
    pub fn encryption_key_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        let bytes = decode_key("session.encryption_key", &self.encryption_key, 32)?;
        if bytes.len() != 32 {
            return Err(ValidationError::EncryptionKeyLength(bytes.len()));
        }
        Ok(bytes)
    }
}

fn default_cookie_name() -> String {
    "sharegate_session".to_string()
}

fn default_cookie_max_age_secs() -> u32 {
    7 * 86400
}
