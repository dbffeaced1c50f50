//! Metrics collection and exposition.
//!
//! # Metrics
//! - `quota_exchange_requests_total` (counter): client admissions by outcome
//!   (dispatched, skipped, failed)
//! - `quota_exchange_updates_total` (counter): response absorption by outcome
//!   (absorbed, discarded)
//! - `quota_exchange_request_duration_seconds` (histogram): round-trip latency
//! - `quota_authority_requests_total` (counter): requests answered by the server
//! - `quota_authority_remaining` (histogram): reported remaining values

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(outcome: &'static str) {
    ::metrics::counter!("quota_exchange_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_update(outcome: &'static str) {
    ::metrics::counter!("quota_exchange_updates_total", "outcome" => outcome).increment(1);
}

pub fn record_round_trip(start: Instant) {
    ::metrics::histogram!("quota_exchange_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_authority_decision(remaining: i64) {
    ::metrics::counter!("quota_authority_requests_total").increment(1);
    ::metrics::histogram!("quota_authority_remaining").record(remaining as f64);
}
