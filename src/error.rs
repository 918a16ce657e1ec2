//! Unified error handling for sharegate.
//!
//! This module provides the request-level error hierarchy for the gate,
//! with HTTP status mapping and metric labeling.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use crate::security::oidc::OidcError;
use crate::security::session::SessionError;
use crate::upstream::UpstreamError;

// ============================================================================
// Request Errors (authentication and forwarding)
// ============================================================================

/// Errors that can occur while authenticating and forwarding a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Capability token malformed or outside every validity window.
    /// One variant for both: the response must not reveal which check failed.
    #[error("invalid capability token")]
    InvalidToken,

    #[error("undecodable request path")]
    BadPath,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("callback state does not match the pending login")]
    StateMismatch,

    #[error("id token nonce does not match the pending login")]
    NonceMismatch,

    #[error("identity domain '{0}' is not allowed")]
    DomainNotAllowed(String),

    #[error("id token rejected: {0}")]
    IdTokenRejected(#[source] OidcError),

    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(#[source] OidcError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::BadPath => "bad_path",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::StateMismatch => "state_mismatch",
            Self::NonceMismatch => "nonce_mismatch",
            Self::DomainNotAllowed(_) => "domain_not_allowed",
            Self::IdTokenRejected(_) => "id_token_rejected",
            Self::ExchangeFailed(_) => "exchange_failed",
            Self::Session(_) => "session_error",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for the response.
    ///
    /// Security violations (forged state, nonce or domain mismatch, rejected
    /// id token) are client errors; provider and session failures are server
    /// errors local to this request.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidToken | Self::BadPath => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::StateMismatch
            | Self::NonceMismatch
            | Self::DomainNotAllowed(_)
            | Self::IdTokenRejected(_) => StatusCode::BAD_REQUEST,
            Self::ExchangeFailed(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Body text sent to the client. Never includes failure detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidToken => "Invalid Token",
            Self::BadPath => "Bad Request",
            Self::MethodNotAllowed => "Method not allowed",
            Self::StateMismatch => "state does not match",
            Self::NonceMismatch | Self::DomainNotAllowed(_) | Self::IdTokenRejected(_) => {
                "Login Failed"
            }
            Self::ExchangeFailed(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal Server Error"
            }
            Self::Upstream(_) => "Bad Gateway",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        crate::metrics::record_request_error(self.error_code());
        (self.status(), self.user_message()).into_response()
    }
}

// ============================================================================
// Component Errors (kept in their modules for dependency proximity)
// ============================================================================

// SessionError lives in security/session.rs (chacha20poly1305 in scope),
// OidcError in security/oidc.rs (reqwest/jsonwebtoken in scope), and
// UpstreamError in upstream.rs. AuthError wraps all three.
