//! Request dispatch and authentication decisions.
//!
//! Every request entering the gate lands here and is resolved to exactly
//! one of four routes:
//!
//! - the login callback (`/oauth/callback`, exact, no trailing slash)
//! - capability paths (`/s/{subject}/{token}/...`)
//! - protected roots (`/album/...` by default), requiring a login
//! - everything else, forwarded anonymously
//!
//! Paths are handled as decoded segment vectors, never as re-joined
//! strings. Splitting happens on the raw path first and each segment is
//! percent-decoded on its own, so a `%2F` inside a token stays inside
//! that token, and `%61lbum` classifies the same as `album`. Dot segments
//! are resolved during decoding; by the time a route is chosen there is
//! nothing left for the upstream to normalize differently.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use http::{Method, Request, StatusCode, header};
use sharegate_token::{SECRET_LEN, Secret, TokenData};
use subtle::ConstantTimeEq;
use tracing::{Instrument, info, warn};

use crate::error::AuthError;
use crate::http::AppState;
use crate::metrics;
use crate::security::identity::Identity;
use crate::security::oidc::OidcError;
use crate::security::session::{LoginAttempt, SessionData};
use crate::telemetry::RequestTimer;

/// The four ways a request can be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The login callback endpoint.
    Callback,
    /// A share link carrying its own credential.
    Capability,
    /// A resource root that requires a completed login.
    Protected,
    /// Anything else, forwarded without authentication.
    Anonymous,
}

impl Route {
    fn classify(segments: &[String], trailing_slash: bool, protected_roots: &[String]) -> Self {
        if !trailing_slash && segments.len() == 2 && segments[0] == "oauth" && segments[1] == "callback"
        {
            return Self::Callback;
        }
        match segments.first().map(String::as_str) {
            Some("s") => Self::Capability,
            Some(root) if protected_roots.iter().any(|r| r == root) => Self::Protected,
            _ => Self::Anonymous,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Callback => "callback",
            Self::Capability => "capability",
            Self::Protected => "protected",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Entry point for every request the gate receives.
pub async fn handle(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let span = crate::telemetry::spans::request(request.method().as_str(), request.uri().path());
    dispatch(state, peer, request)
        .instrument(span)
        .await
        .unwrap_or_else(|err| err.into_response())
}

async fn dispatch(
    state: AppState,
    peer: SocketAddr,
    request: Request<Body>,
) -> Result<Response, AuthError> {
    let raw_path = request.uri().path();
    let trailing_slash = raw_path.ends_with('/');
    let segments = path_segments(raw_path)?;
    let route = Route::classify(&segments, trailing_slash, &state.config.server.protected_roots);
    let _timer = RequestTimer::new(route.label());

    match route {
        Route::Callback => finish_login(&state, request).await,
        Route::Capability => serve_capability(&state, peer, request, segments, trailing_slash).await,
        Route::Protected => serve_protected(&state, peer, request, segments, trailing_slash).await,
        Route::Anonymous => {
            forward(
                &state,
                peer,
                request,
                &segments,
                trailing_slash,
                Identity::Anonymous,
            )
            .await
        }
    }
}

/// Authenticate a share link and forward the remainder of its path.
///
/// The link shape is `/s/{subject}/{token}/{root}/{entitlement}/...`; the
/// forwarded path starts at `{root}`. The token is tried first against
/// the entitlement named in the path, then as a global token with the
/// wider scope but shorter validity window.
async fn serve_capability(
    state: &AppState,
    peer: SocketAddr,
    request: Request<Body>,
    segments: Vec<String>,
    trailing_slash: bool,
) -> Result<Response, AuthError> {
    let subject = segments.get(1).cloned().unwrap_or_default();
    let token = segments.get(2).cloned().unwrap_or_default();
    let entitlement = segments.get(4).cloned().unwrap_or_default();

    let mut data = TokenData {
        timestamp: Utc::now(),
        subject: subject.clone(),
        entitlement,
    };

    let tokens = &state.config.tokens;
    let outcome = match state
        .tokens
        .validate(&data, &token, tokens.per_album_validity_days)
    {
        Ok(true) => Some("resource"),
        Ok(false) => {
            data.entitlement = String::new();
            match state
                .tokens
                .validate(&data, &token, tokens.global_validity_days)
            {
                Ok(true) => Some("global"),
                Ok(false) | Err(_) => None,
            }
        }
        Err(_) => None,
    };

    let Some(outcome) = outcome else {
        metrics::record_capability_validation("rejected");
        warn!(subject = %subject, "share link rejected");
        return Err(AuthError::InvalidToken);
    };
    metrics::record_capability_validation(outcome);

    let forwarded = segments.get(3..).unwrap_or_default();
    forward(
        state,
        peer,
        request,
        forwarded,
        trailing_slash,
        Identity::Capability { subject },
    )
    .await
}

/// Serve a protected root: forward for a logged-in browser, otherwise
/// send it to the identity provider and remember where it was headed.
async fn serve_protected(
    state: &AppState,
    peer: SocketAddr,
    request: Request<Body>,
    segments: Vec<String>,
    trailing_slash: bool,
) -> Result<Response, AuthError> {
    let mut session = state.sessions.open(request.headers())?;
    if matches!(session.identity, Identity::Federated { .. }) {
        let identity = session.identity.clone();
        return forward(state, peer, request, &segments, trailing_slash, identity).await;
    }

    let mut return_path = rebuild_path(&segments, trailing_slash);
    if let Some(query) = request.uri().query() {
        return_path.push('?');
        return_path.push_str(query);
    }
    start_login(state, &mut session, return_path)
}

/// Issue the authorization redirect for a new login attempt.
///
/// The raw state and nonce secrets go into the sealed session; only
/// their hashed projections appear in the redirect URL.
fn start_login(
    state: &AppState,
    session: &mut SessionData,
    return_path: String,
) -> Result<Response, AuthError> {
    let nonce = Secret::generate(SECRET_LEN);
    let login_state = Secret::generate(SECRET_LEN);
    let url = state
        .oidc
        .authorization_url(&login_state.hashed(), &nonce.hashed());

    session.login = Some(LoginAttempt {
        state: login_state.hex(),
        nonce: nonce.hex(),
        return_path,
    });
    session.issued_at = Utc::now().timestamp();
    let cookie = state.sessions.issue(session)?;

    redirect_with_cookie(&url, cookie)
}

/// Complete a login attempt at the callback endpoint.
///
/// Rejections here never rewrite the session cookie; the pending attempt
/// stays consumed only on the success and restart paths, which are the
/// only ones that set a new cookie.
async fn finish_login(state: &AppState, request: Request<Body>) -> Result<Response, AuthError> {
    if request.method() != Method::GET {
        return Err(AuthError::MethodNotAllowed);
    }

    let mut session = state.sessions.open(request.headers())?;
    let Some(attempt) = session.login.take() else {
        // No pending attempt means the cookie expired or never existed.
        // Start over and land on the front page.
        metrics::record_login("restarted");
        info!("callback without a pending login, restarting");
        return start_login(state, &mut session, "/".to_string());
    };

    let query = request.uri().query().unwrap_or_default();

    let stored_state = Secret::from_hex(&attempt.state)
        .map_err(|e| AuthError::Internal(format!("stored login state: {e}")))?;
    let presented_state = query_param(query, "state").unwrap_or_default();
    if !bool::from(
        stored_state
            .hashed()
            .as_bytes()
            .ct_eq(presented_state.as_bytes()),
    ) {
        metrics::record_login("rejected");
        warn!("callback state does not match the pending login");
        return Err(AuthError::StateMismatch);
    }

    let code = query_param(query, "code").unwrap_or_default();
    let raw_id_token = state
        .oidc
        .exchange_code(&code)
        .await
        .map_err(AuthError::ExchangeFailed)?;

    let claims = match state.oidc.verify_id_token(&raw_id_token) {
        Ok(claims) => claims,
        Err(e) => {
            metrics::record_login("rejected");
            warn!(error = %e, "id token rejected");
            return Err(AuthError::IdTokenRejected(e));
        }
    };

    let stored_nonce = Secret::from_hex(&attempt.nonce)
        .map_err(|e| AuthError::Internal(format!("stored login nonce: {e}")))?;
    let presented_nonce = claims.nonce.clone().unwrap_or_default();
    if !bool::from(
        stored_nonce
            .hashed()
            .as_bytes()
            .ct_eq(presented_nonce.as_bytes()),
    ) {
        metrics::record_login("rejected");
        warn!("id token nonce does not match the pending login");
        return Err(AuthError::NonceMismatch);
    }

    if let Some(required) = state.oidc.allowed_domain() {
        if claims.hd.as_deref() != Some(required) {
            let presented = claims.hd.clone().unwrap_or_default();
            metrics::record_login("rejected");
            warn!(domain = %presented, "hosted domain is not allowed");
            return Err(AuthError::DomainNotAllowed(presented));
        }
    }

    let email = match claims.email.as_deref() {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => {
            metrics::record_login("rejected");
            warn!("id token carries no email claim");
            return Err(AuthError::IdTokenRejected(OidcError::MissingEmail));
        }
    };

    session.identity = Identity::Federated {
        subject: email.clone(),
    };
    session.issued_at = Utc::now().timestamp();
    let cookie = state.sessions.issue(&session)?;

    metrics::record_login("completed");
    info!(subject = %email, "login completed");
    redirect_with_cookie(&sanitize_return_path(attempt.return_path), cookie)
}

/// Relay the request upstream under the resolved identity.
async fn forward(
    state: &AppState,
    peer: SocketAddr,
    request: Request<Body>,
    forward_segments: &[String],
    trailing_slash: bool,
    identity: Identity,
) -> Result<Response, AuthError> {
    let (parts, body) = request.into_parts();

    info!(
        "[{}] {} {}",
        identity,
        parts.method,
        display_path(forward_segments, trailing_slash)
    );

    let mut path = rebuild_path(forward_segments, trailing_slash);
    if let Some(query) = parts.uri.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok(state
        .upstream
        .forward(parts.method, &path, &parts.headers, body, &identity, peer)
        .await?)
}

// ============================================================================
// Path handling
// ============================================================================

/// Split a raw request path into decoded segments.
///
/// Decoding happens per segment, after splitting, so encoded slashes do
/// not create segment boundaries. Empty and `.` segments vanish; `..`
/// removes the previous segment and cannot climb above the root.
fn path_segments(raw: &str) -> Result<Vec<String>, AuthError> {
    let mut segments = Vec::new();
    for raw_segment in raw.split('/') {
        if !valid_escapes(raw_segment) {
            return Err(AuthError::BadPath);
        }
        let decoded = urlencoding::decode(raw_segment).map_err(|_| AuthError::BadPath)?;
        match decoded.as_ref() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(decoded.into_owned()),
        }
    }
    Ok(segments)
}

/// `urlencoding::decode` passes a `%` without two hex digits through
/// untouched. Such a path has no canonical decoding, so it never
/// reaches the upstream.
fn valid_escapes(segment: &str) -> bool {
    let mut bytes = segment.bytes();
    while let Some(b) = bytes.next() {
        if b != b'%' {
            continue;
        }
        match (bytes.next(), bytes.next()) {
            (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {}
            _ => return false,
        }
    }
    true
}

/// Re-encode segments into a path for the upstream hop.
fn rebuild_path(segments: &[String], trailing_slash: bool) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    if trailing_slash {
        path.push('/');
    }
    path
}

/// Decoded path for log lines.
fn display_path(segments: &[String], trailing_slash: bool) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    if trailing_slash {
        path.push('/');
    }
    path
}

/// A stored return path must be a local absolute path; anything else
/// falls back to the front page so the callback can never redirect
/// off-site.
fn sanitize_return_path(path: String) -> String {
    if path.starts_with('/') && !path.starts_with("//") {
        path
    } else {
        "/".to_string()
    }
}

/// Pull one parameter out of a raw query string.
fn query_param(query: &str, name: &str) -> Option<String> {
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            return urlencoding::decode(value).ok().map(|v| v.into_owned());
        }
    }
    None
}

fn redirect_with_cookie(
    location: &str,
    cookie: http::HeaderValue,
) -> Result<Response, AuthError> {
    metrics::record_session_issued();
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .header(header::SET_COOKIE, cookie)
        .body(Body::empty())
        .map_err(|e| AuthError::Internal(e.to_string()))
}
