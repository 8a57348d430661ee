//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relays by outcome and status
//! - `relay_request_duration_seconds` (histogram): relay latency by outcome
//! - `origin_decisions_total` (counter): origin checks by rule/reason
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::security::origin::OriginDecision;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_relay(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "relay_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("relay_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_origin_decision(decision: OriginDecision) {
    let allowed = if decision.is_allowed() { "allowed" } else { "denied" };
    counter!(
        "origin_decisions_total",
        "decision" => allowed,
        "rule" => decision.as_str()
    )
    .increment(1);
}
