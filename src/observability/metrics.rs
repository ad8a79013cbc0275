//! Metrics collection and exposition.
//!
//! # Metrics
//! - `consuldog_catalog_errors_total` (counter): failed catalog queries by node
//! - `consuldog_snapshots_total` (counter): node snapshots applied by node
//! - `consuldog_registry_services` (gauge): live services in the registry
//! - `consuldog_template_failures_total` (counter): rejected templates by stage
//! - `consuldog_config_writes_total` (counter): config file writes by type, outcome
//! - `consuldog_reloads_total` (counter): reload attempts by outcome
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these helpers unconditionally.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_catalog_error(node: &str) {
    metrics::counter!("consuldog_catalog_errors_total", "node" => node.to_string()).increment(1);
}

pub fn record_snapshot(node: &str) {
    metrics::counter!("consuldog_snapshots_total", "node" => node.to_string()).increment(1);
}

pub fn record_registry_size(services: usize) {
    metrics::gauge!("consuldog_registry_services").set(services as f64);
}

pub fn record_template_failure(stage: &'static str) {
    metrics::counter!("consuldog_template_failures_total", "stage" => stage).increment(1);
}

pub fn record_config_write(monitor_type: &str, success: bool) {
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!(
        "consuldog_config_writes_total",
        "type" => monitor_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_reload(success: bool) {
    let outcome = if success { "ok" } else { "skipped" };
    metrics::counter!("consuldog_reloads_total", "outcome" => outcome).increment(1);
}
