//! Prometheus metrics for the edge gate.
//!
//! Metrics are exposed via a dedicated HTTP listener (default port 9090).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `edge_gate_requests_total` - Gate decisions (label: outcome)
//! - `edge_gate_swept_entries_total` - Expired rate-limit entries removed
//!
//! ## Gauges
//! - `edge_gate_tracked_clients` - Clients currently in the rate-limit table
//!
//! All recording functions are no-ops until [`init_metrics`] installs the
//! exporter, so library users and tests need no setup.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "edge_gate_requests_total";
    pub const SWEPT_ENTRIES_TOTAL: &str = "edge_gate_swept_entries_total";
    pub const TRACKED_CLIENTS: &str = "edge_gate_tracked_clients";
}

/// Values of the `outcome` label.
pub mod outcome {
    pub const ALLOWED: &str = "allowed";
    pub const ORIGIN_REJECTED: &str = "origin_rejected";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const ERROR: &str = "error";
}

/// Install the Prometheus exporter and describe all metrics.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (port in use,
/// recorder already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_TOTAL,
        "Requests seen by the edge gate, by outcome"
    );
    describe_counter!(
        names::SWEPT_ENTRIES_TOTAL,
        "Expired rate limit entries removed from the table"
    );
    describe_gauge!(
        names::TRACKED_CLIENTS,
        "Clients currently held in the rate limit table"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Count one gate decision.
pub fn record_gate_decision(outcome: &'static str) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Count entries removed by a sweep.
pub fn record_swept_entries(count: u64) {
    counter!(names::SWEPT_ENTRIES_TOTAL).increment(count);
}

/// Update the tracked-clients gauge.
pub fn set_tracked_clients(count: usize) {
    gauge!(names::TRACKED_CLIENTS).set(count as f64);
}
