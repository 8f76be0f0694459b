//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use std::time::Duration;

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    // Force initialization of the lazy static
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "conduit_requests_total",
        "Total number of chat completion requests processed"
    );
    metrics::describe_histogram!(
        "conduit_request_duration_seconds",
        "Chat completion request duration in seconds"
    );
    metrics::describe_counter!(
        "conduit_candidate_attempts_total",
        "Upstream candidate endpoint attempts by outcome"
    );
    metrics::describe_histogram!(
        "conduit_candidate_duration_seconds",
        "Upstream candidate endpoint latency in seconds"
    );
    metrics::describe_counter!(
        "conduit_session_acquisitions_total",
        "Upstream login attempts by result"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a chat completion request
///
/// The requested model is caller-supplied text and is logged, not used as
/// a label.
pub fn record_request(status: &str, duration_secs: f64) {
    metrics::counter!("conduit_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("conduit_request_duration_seconds", "status" => status.to_string())
        .record(duration_secs);
}

/// Record one try of a candidate endpoint
pub fn record_candidate_attempt(endpoint: &str, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "conduit_candidate_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("conduit_candidate_duration_seconds", "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record an upstream login
pub fn record_session_acquisition(result: &str) {
    metrics::counter!("conduit_session_acquisitions_total", "result" => result.to_string())
        .increment(1);
}
