//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, UpstreamConfig)
//! - [`oidc`]: OpenID Connect provider configuration (OidcConfig)
//! - [`session`]: Session cookie configuration (SessionConfig)
//! - [`tokens`]: Capability token configuration (TokensConfig)

mod oidc;
mod session;
mod tokens;
mod types;

pub use oidc::OidcConfig;
pub use session::SessionConfig;
pub use tokens::TokensConfig;
pub use types::{Config, ConfigError, ServerConfig, UpstreamConfig, ValidationError};
