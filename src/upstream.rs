//! Reverse proxy to the protected upstream.
//!
//! Requests that pass the frontend are relayed to the single configured
//! upstream with the resolved identity attached as `x-forwarded-identity`.
//! Bodies stream through in both directions; the gate never buffers a
//! full photo archive response.
//!
//! Header hygiene at the boundary:
//! - Hop-by-hop headers are stripped in both directions.
//! - The gate's own session cookie is scrubbed from the forwarded
//!   `Cookie` header. All other cookies pass through untouched.
//! - Any inbound `x-forwarded-identity` is discarded and replaced, so a
//!   client can never smuggle an identity past the gate.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use http::header::{COOKIE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use thiserror::Error;
use tracing::{Instrument, debug};

use crate::config::UpstreamConfig;
use crate::security::identity::Identity;
use crate::telemetry;

/// Header carrying the resolved identity to the upstream.
pub const IDENTITY_HEADER: &str = "x-forwarded-identity";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Connection-level headers that must not cross the proxy.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Errors relaying a request to the upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("assembling relayed response failed: {0}")]
    Relay(#[from] http::Error),
}

/// A client for the single configured upstream.
pub struct ProxyUpstream {
    base_url: String,
    session_cookie: String,
    http: reqwest::Client,
}

impl ProxyUpstream {
    /// Build the proxy client.
    ///
    /// Redirects are relayed to the browser, never followed here, and
    /// only connection establishment is bounded: response bodies may
    /// stream for as long as the transfer takes.
    pub fn new(config: &UpstreamConfig, session_cookie: String) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            session_cookie,
            http,
        })
    }

    /// Relay one request and stream the upstream response back.
    ///
    /// `path_and_query` must already be re-encoded; it is appended to the
    /// upstream base URL as-is.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Body,
        identity: &Identity,
        peer: SocketAddr,
    ) -> Result<Response, UpstreamError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let span = telemetry::spans::upstream(method.as_str(), path_and_query);

        let outbound = prepare_headers(headers, &self.session_cookie, identity, peer);
        let request = self
            .http
            .request(method, &url)
            .headers(outbound)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()));

        async {
            let upstream = request.send().await?;
            let status = upstream.status();
            crate::metrics::record_upstream_response(status.as_u16());
            debug!(status = %status, "upstream responded");

            let mut builder = Response::builder().status(status);
            if let Some(headers) = builder.headers_mut() {
                *headers = relay_headers(upstream.headers());
            }
            Ok(builder.body(Body::from_stream(upstream.bytes_stream()))?)
        }
        .instrument(span)
        .await
    }
}

/// Sanitize inbound headers for the upstream hop.
fn prepare_headers(
    inbound: &HeaderMap,
    session_cookie: &str,
    identity: &Identity,
    peer: SocketAddr,
) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || name == HOST || name == IDENTITY_HEADER {
            continue;
        }
        if name == COOKIE {
            if let Some(kept) = scrub_cookies(value, session_cookie) {
                outbound.append(COOKIE, kept);
            }
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }

    if let Ok(value) = HeaderValue::try_from(identity.to_string()) {
        outbound.insert(IDENTITY_HEADER, value);
    }

    // Append the peer address to any forwarding chain we received.
    let forwarded = match inbound.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {}", peer.ip()),
        None => peer.ip().to_string(),
    };
    if let Ok(value) = HeaderValue::try_from(forwarded) {
        outbound.insert(X_FORWARDED_FOR, value);
    }

    outbound
}

/// Drop hop-by-hop headers from an upstream response.
fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_hop_by_hop(name) {
            continue;
        }
        relayed.append(name.clone(), value.clone());
    }
    relayed
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.iter().any(|h| name.as_str() == *h)
}

/// Remove the gate's session cookie from a `Cookie` header value.
///
/// Returns `None` when the session cookie was the only one, so the
/// header disappears rather than arriving empty.
fn scrub_cookies(value: &HeaderValue, session_cookie: &str) -> Option<HeaderValue> {
    let raw = value.to_str().ok()?;
    let kept: Vec<&str> = raw
        .split(';')
        .map(str::trim)
        .filter(|pair| {
            !pair
                .strip_prefix(session_cookie)
                .is_some_and(|rest| rest.starts_with('='))
        })
        .filter(|pair| !pair.is_empty())
        .collect();
    if kept.is_empty() {
        return None;
    }
    HeaderValue::try_from(kept.join("; ")).ok()
}
