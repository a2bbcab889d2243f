//! Metrics collection and exposition.
//!
//! # Metrics
//! - `greenlight_requests_total` (counter): requests by method, status
//! - `greenlight_request_duration_seconds` (histogram): latency distribution
//! - `greenlight_rate_limited_total` (counter): denied admissions
//! - `greenlight_rate_limiter_clients` (gauge): clients tracked by the limiter
//! - `greenlight_rate_limiter_evicted_total` (counter): idle clients swept
//! - `greenlight_edit_conflicts_total` (counter): rejected optimistic updates
//! - `greenlight_background_jobs` (gauge): background jobs in flight
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "greenlight_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("greenlight_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("greenlight_rate_limited_total").increment(1);
}

pub fn record_limiter_clients(count: usize) {
    gauge!("greenlight_rate_limiter_clients").set(count as f64);
}

pub fn record_limiter_evictions(count: usize) {
    counter!("greenlight_rate_limiter_evicted_total").increment(count as u64);
}

pub fn record_edit_conflict(resource: &'static str) {
    counter!("greenlight_edit_conflicts_total", "resource" => resource).increment(1);
}

pub fn record_background_jobs(count: usize) {
    gauge!("greenlight_background_jobs").set(count as f64);
}
