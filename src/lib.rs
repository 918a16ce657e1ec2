//! sharegate - access gate for a private photo archive.
//!
//! Sits in front of a single upstream and grants access two ways:
//! stateless capability share links, and browser logins federated to an
//! OpenID Connect provider. Every allowed request is forwarded with the
//! resolved identity in the `x-forwarded-identity` header; the upstream
//! never sees a credential.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod security;
pub mod telemetry;
pub mod upstream;
