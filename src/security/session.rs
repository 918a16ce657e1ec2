//! Sealed session cookies.
//!
//! Browser state is carried entirely in one cookie; the server keeps no
//! session table. The cookie value is the JSON-serialized [`SessionData`],
//! encrypted with ChaCha20-Poly1305 and then authenticated with
//! HMAC-SHA256 under a separate key, so a holder of one key cannot forge
//! or read cookies without the other.
//!
//! Wire layout, base64 (URL-safe, unpadded):
//!
//! ```text
//! nonce (12 bytes) || ciphertext || hmac tag (32 bytes)
//! ```
//!
//! The cookie name is bound into the ciphertext as associated data, so a
//! value copied onto a different cookie name fails to open.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroize;

use crate::config::{ConfigError, SessionConfig};
use crate::security::identity::Identity;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 32;

/// Errors opening or sealing a session cookie.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Cookie too short or not valid base64.
    #[error("malformed session cookie")]
    Malformed,

    /// HMAC tag did not verify.
    #[error("session cookie failed authentication")]
    Verification,

    /// Authenticated payload would not decrypt.
    #[error("session cookie failed decryption")]
    Decryption,

    /// Decrypted payload is not valid session data.
    #[error("session payload rejected: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// Encryption failed while sealing.
    #[error("session data could not be sealed")]
    Sealing,
}

/// An in-flight login, stored in the session between the redirect to the
/// identity provider and the callback. At most one attempt is pending per
/// browser; starting a new login replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    /// Hex of the raw state secret. Only its SHA-256 leaves the process.
    pub state: String,
    /// Hex of the raw nonce secret, checked against the id token.
    pub nonce: String,
    /// Path to return the browser to after the login completes.
    pub return_path: String,
}

/// Everything the gate remembers about one browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Who the browser is logged in as.
    pub identity: Identity,
    /// Pending login attempt, if a redirect has been issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginAttempt>,
    /// Unix seconds when this cookie was sealed.
    pub issued_at: i64,
}

impl SessionData {
    /// A brand-new anonymous session.
    pub fn fresh() -> Self {
        Self {
            identity: Identity::Anonymous,
            login: None,
            issued_at: Utc::now().timestamp(),
        }
    }
}

/// Seals and opens session cookies.
pub struct SessionStore {
    cookie_name: String,
    authentication_key: Vec<u8>,
    cipher: ChaCha20Poly1305,
    max_age_secs: u32,
    secure: bool,
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.authentication_key.zeroize();
    }
}

impl SessionStore {
    /// Build a store from validated session configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        let authentication_key = config.authentication_key_bytes()?;
        let encryption_key = config.encryption_key_bytes()?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&encryption_key));
        Ok(Self {
            cookie_name: config.cookie_name.clone(),
            authentication_key,
            cipher,
            max_age_secs: config.cookie_max_age_secs,
            secure: config.secure_cookies,
        })
    }

    /// Name of the cookie this store owns.
    #[inline]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Read the session out of the request headers.
    ///
    /// No cookie, or a cookie sealed longer ago than the configured
    /// max age, yields a fresh anonymous session. A cookie that is
    /// present but will not open is an error: it means key mismatch
    /// or tampering, not a logged-out browser.
    pub fn open(&self, headers: &http::HeaderMap) -> Result<SessionData, SessionError> {
        let Some(value) = self.find_cookie(headers) else {
            return Ok(SessionData::fresh());
        };
        let data = self.open_value(&value)?;
        let age = Utc::now().timestamp().saturating_sub(data.issued_at);
        if age > i64::from(self.max_age_secs) {
            return Ok(SessionData::fresh());
        }
        Ok(data)
    }

    /// Seal the session and render the full `Set-Cookie` header value.
    pub fn issue(&self, data: &SessionData) -> Result<http::HeaderValue, SessionError> {
        let sealed = self.seal(data)?;
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name, sealed, self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        http::HeaderValue::try_from(cookie).map_err(|_| SessionError::Sealing)
    }

    fn seal(&self, data: &SessionData) -> Result<String, SessionError> {
        let plaintext = serde_json::to_vec(data)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: &plaintext,
                    aad: self.cookie_name.as_bytes(),
                },
            )
            .map_err(|_| SessionError::Sealing)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        let tag = self.authenticate(&sealed);
        sealed.extend_from_slice(&tag);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    fn open_value(&self, value: &str) -> Result<SessionData, SessionError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|_| SessionError::Malformed)?;
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(SessionError::Malformed);
        }

        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        let expected = self.authenticate(body);
        if !bool::from(expected.as_slice().ct_eq(tag)) {
            return Err(SessionError::Verification);
        }

        let (nonce_bytes, ciphertext) = body.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: self.cookie_name.as_bytes(),
                },
            )
            .map_err(|_| SessionError::Decryption)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn authenticate(&self, body: &[u8]) -> [u8; TAG_LEN] {
        // KeyInit is in scope for the cipher and also offers new_from_slice
        // on Hmac, so the Mac constructor must be named explicitly.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.authentication_key)
            .expect("HMAC can take key of any size");
        mac.update(body);
        mac.finalize().into_bytes().into()
    }

    /// Locate our cookie among however many the browser sent.
    fn find_cookie(&self, headers: &http::HeaderMap) -> Option<String> {
        for header in headers.get_all(http::header::COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for pair in raw.split(';') {
                let pair = pair.trim();
                if let Some(value) = pair.strip_prefix(&self.cookie_name) {
                    if let Some(value) = value.strip_prefix('=') {
                        return Some(value.to_string());
                    }
                }
            }
        }
        None
    }
}
