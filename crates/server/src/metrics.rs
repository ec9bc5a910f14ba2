//! Prometheus metrics

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder; idempotent
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    if HANDLE.get().is_none() {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = HANDLE.set(handle);
                metrics::describe_counter!(
                    "bima_requests_total",
                    "HTTP requests handled, by endpoint"
                );
                metrics::describe_histogram!(
                    "bima_round_trip_seconds",
                    "Voice round-trip latency by stage"
                );
            },
            Err(e) => {
                tracing::warn!("failed to install metrics recorder: {}", e);
            },
        }
    }
    HANDLE.get()
}

/// Render the metrics exposition text
pub async fn metrics_handler() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

/// Count a handled request
pub fn record_request(endpoint: &'static str) {
    metrics::counter!("bima_requests_total", "endpoint" => endpoint).increment(1);
}

/// Record one stage of a voice round-trip
pub fn record_round_trip(stage: &'static str, seconds: f64) {
    metrics::histogram!("bima_round_trip_seconds", "stage" => stage).record(seconds);
}
