//! Prometheus metrics collection for sharegate.
//!
//! Provides production-ready observability via Prometheus metrics exposed on
//! an HTTP endpoint. Tracks request routing, capability validation, login
//! outcomes, and upstream behavior.
//!
//! ## Gate-Specific Metrics
//!
//! - `sharegate_requests_total{route}` - Requests by route class
//! - `sharegate_request_duration_seconds{route}` - Request latency histogram
//! - `sharegate_capability_validations_total{outcome}` - Share link checks
//! - `sharegate_logins_total{outcome}` - Login flow completions

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Requests by route class (anonymous, capability, protected, callback).
pub static REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Error responses by error code.
pub static REQUEST_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Capability validations by outcome (resource, global, rejected).
pub static CAPABILITY_VALIDATIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Login flow outcomes (completed, restarted, rejected).
pub static LOGINS: OnceLock<IntCounterVec> = OnceLock::new();

/// Session cookies sealed and sent to browsers.
pub static SESSIONS_ISSUED: OnceLock<IntCounter> = OnceLock::new();

/// Upstream responses by status class.
pub static UPSTREAM_RESPONSES: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// End-to-end request latency by route class.
pub static REQUEST_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        REQUESTS,
        IntCounterVec::new(
            Opts::new("sharegate_requests_total", "Requests by route class"),
            &["route"]
        )
    );
    register!(
        REQUEST_ERRORS,
        IntCounterVec::new(
            Opts::new("sharegate_request_errors_total", "Error responses by code"),
            &["error"]
        )
    );
    register!(
        CAPABILITY_VALIDATIONS,
        IntCounterVec::new(
            Opts::new(
                "sharegate_capability_validations_total",
                "Share link validations by outcome"
            ),
            &["outcome"]
        )
    );
    register!(
        LOGINS,
        IntCounterVec::new(
            Opts::new("sharegate_logins_total", "Login flow outcomes"),
            &["outcome"]
        )
    );
    register!(
        SESSIONS_ISSUED,
        IntCounter::new("sharegate_sessions_issued_total", "Session cookies issued")
    );
    register!(
        UPSTREAM_RESPONSES,
        IntCounterVec::new(
            Opts::new(
                "sharegate_upstream_responses_total",
                "Upstream responses by status class"
            ),
            &["status"]
        )
    );
    register!(
        REQUEST_LATENCY,
        HistogramVec::new(
            HistogramOpts::new(
                "sharegate_request_duration_seconds",
                "Request latency by route class"
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["route"]
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for gate-specific metric updates
// ============================================================================

fn get_counter_vec(metric: &OnceLock<IntCounterVec>) -> Option<&IntCounterVec> {
    metric.get()
}

fn get_histogram_vec(metric: &OnceLock<HistogramVec>) -> Option<&HistogramVec> {
    metric.get()
}

/// Record a handled request with latency.
#[inline]
pub fn record_request(route: &str, duration_secs: f64) {
    if let Some(c) = get_counter_vec(&REQUESTS) {
        c.with_label_values(&[route]).inc();
    }
    if let Some(h) = get_histogram_vec(&REQUEST_LATENCY) {
        h.with_label_values(&[route]).observe(duration_secs);
    }
}

/// Record an error response.
#[inline]
pub fn record_request_error(error: &str) {
    if let Some(c) = get_counter_vec(&REQUEST_ERRORS) {
        c.with_label_values(&[error]).inc();
    }
}

/// Record a capability validation outcome.
#[inline]
pub fn record_capability_validation(outcome: &str) {
    if let Some(c) = get_counter_vec(&CAPABILITY_VALIDATIONS) {
        c.with_label_values(&[outcome]).inc();
    }
}

/// Record a login flow outcome.
#[inline]
pub fn record_login(outcome: &str) {
    if let Some(c) = get_counter_vec(&LOGINS) {
        c.with_label_values(&[outcome]).inc();
    }
}

/// Record a session cookie being issued.
#[inline]
pub fn record_session_issued() {
    if let Some(c) = SESSIONS_ISSUED.get() {
        c.inc();
    }
}

/// Record an upstream response by status class.
#[inline]
pub fn record_upstream_response(status: u16) {
    if let Some(c) = get_counter_vec(&UPSTREAM_RESPONSES) {
        let class = match status {
            100..=199 => "1xx",
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        c.with_label_values(&[class]).inc();
    }
}
