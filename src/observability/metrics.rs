//! Metrics collection and exposition.
//!
//! # Metrics
//! - `site_requests_total` (counter): responses by method and status
//! - `site_request_duration_seconds` (histogram): latency distribution
//! - `site_rate_limited_total` (counter): requests rejected with 429
//! - `site_not_found_total` (counter): 404 fallbacks served
//! - `site_internal_errors_total` (counter): generic 500s served
//! - `site_rate_limit_clients` (gauge): client windows held in memory

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "site_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("site_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("site_rate_limited_total").increment(1);
}

pub fn record_not_found() {
    metrics::counter!("site_not_found_total").increment(1);
}

pub fn record_internal_error() {
    metrics::counter!("site_internal_errors_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    metrics::gauge!("site_rate_limit_clients").set(count as f64);
}

/// Middleware counting every response, including caught panics.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}
