//! Telemetry utilities for request timing and correlation.

use std::time::Instant;

/// Guard for timing request handling and recording metrics.
///
/// Records request latency for its route class when dropped, so every
/// exit path out of the frontend is measured.
pub struct RequestTimer {
    route: &'static str,
    start: Instant,
}

impl RequestTimer {
    /// Start timing a request.
    pub fn new(route: &'static str) -> Self {
        Self {
            route,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_request(self.route, duration);
    }
}

/// Standardized span constructors for gate observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one handled request.
    pub fn request(method: &str, path: &str) -> Span {
        info_span!("request", method = %method, path = %path)
    }

    /// Create a span for one upstream exchange.
    pub fn upstream(method: &str, path: &str) -> Span {
        info_span!("upstream", method = %method, path = %path)
    }
}
