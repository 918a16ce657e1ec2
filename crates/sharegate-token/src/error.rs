//! Error types for the token library.

use thiserror::Error;

/// Errors building a [`Secret`](crate::Secret) from an encoded form.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The hex projection could not be decoded.
    #[error("invalid hex encoding: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Errors from token validation.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The presented token is not valid base64.
    ///
    /// Distinct from a token that decodes but matches no day in the
    /// validity window; that case is `Ok(false)`.
    #[error("token is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}
