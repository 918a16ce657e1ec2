//! Random secrets with hex and SHA-256 projections.
//!
//! Used for OIDC nonces, anti-forgery state, and raw key material. The raw
//! bytes stay inside the process; only [`Secret::hashed`] may be sent to a
//! remote party, and the hex form lives only inside a sealed session until
//! it is consumed.

use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::SecretError;

/// Byte length of nonce and anti-forgery state secrets.
pub const SECRET_LEN: usize = 32;

/// Opaque byte secret.
///
/// `Debug` prints only the length. There is deliberately no `Display`;
/// callers must pick [`Secret::hex`] or [`Secret::hashed`] explicitly.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Generate `len` random bytes from the operating system RNG.
    pub fn generate(len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Rebuild a secret from its hex projection.
    pub fn from_hex(encoded: &str) -> Result<Self, SecretError> {
        Ok(Self(hex::decode(encoded)?))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the secret holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex of the raw bytes.
    pub fn hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Lowercase hex of the SHA-256 digest of the raw bytes.
    ///
    /// The only projection that may leave the process.
    pub fn hashed(&self) -> String {
        hex::encode(Sha256::digest(&self.0))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({} bytes)", self.0.len())
    }
}
