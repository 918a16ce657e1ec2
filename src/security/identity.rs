//! Request identity classification.
//!
//! Every request is resolved to exactly one [`Identity`] before it is
//! forwarded. The variant decides which resources the upstream may serve
//! and is transmitted as the `x-forwarded-identity` header.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The authenticated principal behind a request.
///
/// The set is closed: the frontend produces one of these three and the
/// upstream receives its rendered form. There is no "partially logged in"
/// state; a pending login attempt is still [`Identity::Anonymous`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// No credential presented. May only reach unprotected resources.
    Anonymous,
    /// A share link holder. The subject is the name embedded in the link
    /// by whoever minted it, not a verified account.
    Capability {
        /// Subject the capability was minted for.
        subject: String,
    },
    /// A browser user who completed the login flow. The subject is the
    /// email asserted by the identity provider.
    Federated {
        /// Verified email address.
        subject: String,
    },
}

impl Identity {
    /// Whether this identity may reach protected resources.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Capability { subject } => write!(f, "Capability:{subject}"),
            Self::Federated { subject } => write!(f, "Federated:{subject}"),
        }
    }
}
