//! Security module for sharegate.
//!
//! Provides the authentication layers in front of the upstream:
//! - **Frontend**: route classification and per-request authentication
//! - **Sessions**: sealed browser cookies, HMAC-SHA256 + ChaCha20-Poly1305
//! - **OIDC**: authorization code flow against one identity provider
//! - **Identity**: the closed set of principals the upstream can see
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Security Module                          │
//! ├──────────────┬───────────────┬────────────────┬─────────────────┤
//! │   Frontend   │   Sessions    │      OIDC      │    Identity     │
//! │ route + auth │ sealed cookie │ code flow, JWKS│ Anonymous       │
//! │ per segment  │ ChaCha20+HMAC │ RS256 verify   │ Capability      │
//! │ dispatch     │ one attempt   │ nonce + domain │ Federated       │
//! └──────────────┴───────────────┴────────────────┴─────────────────┘
//! ```

pub mod frontend;
pub mod identity;
pub mod oidc;
pub mod session;

// Re-export primary types for convenience
pub use identity::Identity;
pub use oidc::{OidcClient, OidcError};
pub use session::{SessionData, SessionError, SessionStore};
