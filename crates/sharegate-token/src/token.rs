//! HMAC capability tokens bound to a subject, an entitlement, and a calendar day.
//!
//! A token is the standard-alphabet base64 encoding of an HMAC-SHA256 digest
//! over a canonical byte packing of [`TokenData`]. Nothing is ever stored:
//! validation re-derives the digest for each day in the caller's window, so a
//! token expires simply by falling out of that window.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Datelike, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Data a capability token is derived from.
///
/// Immutable value; never persisted. Both generation and validation rebuild
/// it from the request at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    /// Instant the token is derived for; only the UTC calendar day matters.
    pub timestamp: DateTime<Utc>,
    /// Identity the token was issued to.
    pub subject: String,
    /// Resource the token grants access to. Empty means global scope.
    pub entitlement: String,
}

/// Stateless HMAC-SHA256 token generator.
///
/// Holds only the authentication key. Compromise of the key invalidates the
/// whole scheme; there is no rotation and no revocation list.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct TokenGenerator {
    authentication_key: Vec<u8>,
}

impl TokenGenerator {
    /// Create a generator from raw authentication-key bytes.
    pub fn new(authentication_key: &[u8]) -> Self {
        Self {
            authentication_key: authentication_key.to_vec(),
        }
    }

    /// Derive the token for `data`.
    ///
    /// Deterministic: timestamps on the same UTC calendar day produce
    /// identical tokens. The output is 44 characters of padded base64.
    pub fn generate(&self, data: &TokenData) -> String {
        STANDARD.encode(self.digest(data))
    }

    /// Check a presented token against `data` over a day window.
    ///
    /// Re-derives the token for each offset in `[0, validity_days)`, each
    /// time subtracting that many whole days from `data.timestamp`. A token
    /// derived on day `D` therefore validates on any day in
    /// `[D, D + validity_days)`. A token that is not valid base64 is an
    /// error, not merely invalid.
    pub fn validate(
        &self,
        data: &TokenData,
        token: &str,
        validity_days: u32,
    ) -> Result<bool, TokenError> {
        let presented = STANDARD.decode(token)?;

        for days in 0..validity_days {
            let attempt = TokenData {
                timestamp: data.timestamp - Duration::days(i64::from(days)),
                subject: data.subject.clone(),
                entitlement: data.entitlement.clone(),
            };
            let derived = self.digest(&attempt);
            if bool::from(derived.as_slice().ct_eq(&presented)) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn digest(&self, data: &TokenData) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(&self.authentication_key)
            .expect("HMAC can take key of any size");
        mac.update(&canonical_buffer(data));
        mac.finalize().into_bytes().into()
    }
}

/// Pack token data into its canonical byte form.
///
/// Layout: 4-byte little-endian day count, subject bytes, one NUL separator,
/// entitlement bytes with no terminator. The day count is
/// `(year - 2000) * 365 + day-of-year` with no leap-year correction, so it
/// drifts by one day across certain year boundaries; tokens already in
/// circulation depend on this exact arithmetic.
fn canonical_buffer(data: &TokenData) -> Vec<u8> {
    let days_since_y2k =
        ((data.timestamp.year() - 2000) * 365 + data.timestamp.ordinal() as i32) as u32;

    let subject = data.subject.as_bytes();
    let entitlement = data.entitlement.as_bytes();
    let mut buffer = Vec::with_capacity(4 + subject.len() + 1 + entitlement.len());
    buffer.extend_from_slice(&days_since_y2k.to_le_bytes());
    buffer.extend_from_slice(subject);
    buffer.push(0);
    buffer.extend_from_slice(entitlement);
    buffer
}
