//! Metrics collection and exposition.
//!
//! # Metrics
//! - `stapler_requests_total` (counter): requests by method, status
//! - `stapler_request_duration_seconds` (histogram): latency distribution
//! - `stapler_static_served_total` (counter): static responses by result
//!   (`served`, `not_modified`)
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter serves its own scrape endpoint

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "stapler_requests_total",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "stapler_request_duration_seconds",
        "method" => method,
        "status" => status
    )
        .record(start.elapsed().as_secs_f64());
}

/// Record a static resource response.
pub fn record_static(result: &'static str) {
    metrics::counter!("stapler_static_served_total", "result" => result).increment(1);
}
