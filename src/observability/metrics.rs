//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by route, method, status
//! - `proxy_request_duration_seconds` (histogram): latency by route
//! - `proxy_upstream_errors_total` (counter): upstream failures by route, kind
//! - `proxy_body_rewrites_total` (counter): rewritten bodies by route
//! - `proxy_body_replacements_total` (counter): substitutions made by route
//! - `proxy_cache_lookups_total` (counter): cache reads by outcome
//! - `proxy_cache_entries` (gauge): current cache size
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(route: &str, kind: &'static str) {
    counter!("proxy_upstream_errors_total", "route" => route.to_string(), "kind" => kind)
        .increment(1);
}

pub fn record_body_rewrite(route: &str, replacements: usize) {
    counter!("proxy_body_rewrites_total", "route" => route.to_string()).increment(1);
    counter!("proxy_body_replacements_total", "route" => route.to_string())
        .increment(replacements as u64);
}

pub fn record_cache_lookup(outcome: &'static str) {
    counter!("proxy_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
}
