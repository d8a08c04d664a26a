//! Metrics collection and exposition.
//!
//! # Metrics
//! - `secure_api_requests_total` (counter): requests by method, status
//! - `secure_api_request_duration_seconds` (histogram): latency distribution
//! - `secure_api_rate_limited_total` (counter): rejected admissions
//! - `secure_api_threats_detected_total` (counter): detector hits by category
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests and the
//!   default configuration pay nothing
//! - Labels are low-cardinality; paths are never used as labels

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::security::ThreatCategory;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!("secure_api_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    histogram!("secure_api_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("secure_api_rate_limited_total").increment(1);
}

pub fn record_threat(category: ThreatCategory) {
    counter!("secure_api_threats_detected_total", "category" => category.as_str()).increment(1);
}
