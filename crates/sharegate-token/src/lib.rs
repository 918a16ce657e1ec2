//! # sharegate-token
//!
//! Stateless HMAC capability tokens with calendar-day validity windows.
//!
//! ## Features
//!
//! - Deterministic HMAC-SHA256 tokens bound to (subject, entitlement, calendar day)
//! - Day-window validation by re-derivation, with no server-side token state
//! - Random secrets with hex and SHA-256 projections for nonces and CSRF state
//! - Canonical share-URL rendering for minted tokens

#![deny(clippy::all)]
#![warn(missing_docs)]

//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use sharegate_token::{ShareLink, TokenData, TokenGenerator};
//!
//! let generator = TokenGenerator::new(b"0123456789abcdef0123456789abcdef");
//! let data = TokenData {
//!     timestamp: Utc.timestamp_opt(1_588_703_522, 0).unwrap(),
//!     subject: "nmasse".to_string(),
//!     entitlement: "2020-05".to_string(),
//! };
//!
//! // A token issued today validates on any of the next seven days.
//! let token = generator.generate(&data);
//! assert!(generator.validate(&data, &token, 7).unwrap());
//!
//! let link = ShareLink::mint(
//!     &generator,
//!     "https://photos.example.net",
//!     "nmasse",
//!     "2020-05",
//!     data.timestamp,
//! );
//! assert!(link.to_url().starts_with("https://photos.example.net/s/nmasse/"));
//! assert!(link.to_url().ends_with("/album/2020-05/"));
//! ```

mod error;
mod link;
mod secret;
mod token;

pub use error::{SecretError, TokenError};
pub use link::ShareLink;
pub use secret::{SECRET_LEN, Secret};
pub use token::{TokenData, TokenGenerator};
