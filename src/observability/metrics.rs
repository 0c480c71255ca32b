//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_requests_in_flight` (gauge): requests currently being served
//! - `rate_limited_total` (counter): requests refused by the limiter
//! - `rate_limiter_clients` (gauge): client records held by the limiter
//! - `auth_failures_total` (counter): credential failures by reason
//! - `edit_conflicts_total` (counter): versioned writes that lost a race
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Exposition is a Prometheus scrape endpoint on its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [("method", method.to_string()), ("status", status.to_string())];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn request_started() {
    metrics::gauge!("http_requests_in_flight").increment(1.0);
}

pub fn request_finished() {
    metrics::gauge!("http_requests_in_flight").decrement(1.0);
}

pub fn record_rate_limited() {
    metrics::counter!("rate_limited_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    metrics::gauge!("rate_limiter_clients").set(count as f64);
}

pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!("auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_edit_conflict() {
    metrics::counter!("edit_conflicts_total").increment(1);
}
