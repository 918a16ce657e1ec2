//! sharegated - the gate server binary.

use sharegate::config::{Config, ConfigError, ValidationError};
use sharegate::{http, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        if let ConfigError::Validation(
            ValidationError::KeyTooShort { name, .. } | ValidationError::KeyNotBase64 { name, .. },
        ) = &e
        {
            error!("  {} must be at least 32 bytes of base64.", name);
            error!("  Generate one with:");
            error!("    openssl rand -base64 32");
        }
        e
    })?;

    info!(
        listen = %config.server.listen,
        upstream = %config.upstream.url,
        issuer = %config.oidc.issuer_url,
        "Starting sharegated"
    );

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port.unwrap_or(9090);
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        tokio::spawn(async move {
            http::run_metrics_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let listen = config.server.listen;
    let state = http::AppState::from_config(config).await.map_err(|e| {
        error!(error = %e, "Failed to initialize the gate");
        e
    })?;

    http::run_gate_server(state, listen).await
}
