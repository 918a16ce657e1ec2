//! HTTP servers: the gate itself and the Prometheus metrics endpoint.
//!
//! The gate router has a single fallback handler; all routing decisions
//! live in the security frontend where they can be made on decoded path
//! segments. Metrics are served from a separate listener so the scrape
//! endpoint is never reachable through the public gate.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use sharegate_token::TokenGenerator;

use crate::config::Config;
use crate::security::frontend;
use crate::security::{OidcClient, SessionStore};
use crate::upstream::ProxyUpstream;

/// Shared state for the gate handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub oidc: Arc<OidcClient>,
    pub tokens: Arc<TokenGenerator>,
    pub upstream: Arc<ProxyUpstream>,
}

impl AppState {
    /// Assemble the gate's components from a validated configuration.
    ///
    /// Performs OIDC discovery, so this fails when the identity provider
    /// is unreachable or misconfigured.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let sessions = SessionStore::from_config(&config.session)?;
        let oidc = OidcClient::discover(&config.oidc, config.callback_url()).await?;
        let tokens = TokenGenerator::new(&config.tokens.authentication_key_bytes()?);
        let upstream = ProxyUpstream::new(&config.upstream, sessions.cookie_name().to_string())?;

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            oidc: Arc::new(oidc),
            tokens: Arc::new(tokens),
            upstream: Arc::new(upstream),
        })
    }
}

/// Build the gate router.
pub fn build_router(state: AppState) -> Router {
    Router::new().fallback(frontend::handle).with_state(state)
}

/// Run the gate server until it fails.
///
/// This is the public listener; it serves every route class including
/// the login callback.
pub async fn run_gate_server(state: AppState, listen: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    tracing::info!("Gate listening on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Run the HTTP server for Prometheus metrics.
///
/// Binds to `0.0.0.0:port` and serves the `/metrics` endpoint.
/// This is a long-running task that should be spawned in the background.
pub async fn run_metrics_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Prometheus HTTP server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
