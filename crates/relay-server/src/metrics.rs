//! Metrics collection and export for Relay.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tenvis_relay_core::{EventKind, RelayStats};
use tracing::info;

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "relay_requests_total";
    pub const EVENTS_TOTAL: &str = "relay_events_total";
    pub const STREAMS_TOTAL: &str = "relay_streams_total";
    pub const STREAMS_ACTIVE: &str = "relay_streams_active";
    pub const SUBSCRIBERS_ACTIVE: &str = "relay_subscribers_active";
    pub const USERS_CONNECTED: &str = "relay_users_connected";
    pub const ERRORS_TOTAL: &str = "relay_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::REQUESTS_TOTAL,
        "Total number of chat requests by route"
    );
    metrics::describe_counter!(names::EVENTS_TOTAL, "Total number of events published");
    metrics::describe_counter!(
        names::STREAMS_TOTAL,
        "Total number of event streams opened since server start"
    );
    metrics::describe_gauge!(names::STREAMS_ACTIVE, "Current number of open event streams");
    metrics::describe_gauge!(
        names::SUBSCRIBERS_ACTIVE,
        "Current number of attached stream subscribers"
    );
    metrics::describe_gauge!(names::USERS_CONNECTED, "Current number of connected users");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a chat request.
pub fn record_request(route: &'static str) {
    counter!(names::REQUESTS_TOTAL, "route" => route).increment(1);
}

/// Record a published event.
pub fn record_event(kind: EventKind) {
    counter!(names::EVENTS_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Publish the relay's current subscriber and presence counts.
pub fn record_stats(stats: RelayStats) {
    gauge!(names::SUBSCRIBERS_ACTIVE).set(stats.subscriber_count as f64);
    gauge!(names::USERS_CONNECTED).set(stats.connected_users as f64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard for an open event stream.
pub struct StreamMetricsGuard;

impl StreamMetricsGuard {
    /// Create a new metrics guard, recording an opened stream.
    #[must_use]
    pub fn new() -> Self {
        counter!(names::STREAMS_TOTAL).increment(1);
        gauge!(names::STREAMS_ACTIVE).increment(1.0);
        Self
    }
}

impl Default for StreamMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::STREAMS_ACTIVE).decrement(1.0);
    }
}
