//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, mount
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_upstream_failures_total` (counter): 500 envelopes by mount and error kind
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::Label;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, mount: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("mount", mount.to_string()),
    ];
    metrics::counter!("proxy_requests_total", labels.clone()).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request that ended in the 500 envelope.
pub fn record_upstream_failure(mount: &str, kind: &'static str) {
    metrics::counter!(
        "proxy_upstream_failures_total",
        "mount" => mount.to_string(),
        "kind" => kind
    )
    .increment(1);
}
