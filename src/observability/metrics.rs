//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_probe_total` (counter): probe outcomes by chain and outcome
//! - `rpc_call_total` (counter): upstream calls by method and outcome
//! - `rpc_endpoint_health` (gauge): 1=healthy, 0=unhealthy, per URL
//! - `gateway_requests_total` (counter): API requests by route and status
//! - `gateway_request_duration_seconds` (histogram): API latency
//!
//! Without an installed recorder every call here is a no-op.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(chain_id: u64, outcome: &'static str) {
    metrics::counter!("rpc_probe_total", "chain_id" => chain_id.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_rpc_call(method: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("rpc_call_total", "method" => method, "outcome" => outcome).increment(1);
}

pub fn record_endpoint_health(url: &str, healthy: bool) {
    metrics::gauge!("rpc_endpoint_health", "url" => url.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}
