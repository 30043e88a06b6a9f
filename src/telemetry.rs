//! Per-route request metrics in Prometheus text format.
//!
//! Each [`RequestMetrics`] owns its own recorder rather than installing a
//! process-wide one, so several routers (or tests) never share counters.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram, with_local_recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};

/// Requests served, labelled by `route` and HTTP `status`.
pub const REQUESTS_TOTAL: &str = "pagekit_http_requests_total";
/// Request latency in seconds, labelled by `route`.
pub const REQUEST_DURATION: &str = "pagekit_http_request_duration_seconds";

/// Request counters and latency histograms for the pagination routes.
#[derive(Clone)]
pub struct RequestMetrics {
    recorder: Arc<PrometheusRecorder>,
}

impl RequestMetrics {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(PrometheusBuilder::new().build_recorder()),
        }
    }

    /// Records one finished request.
    pub fn observe(&self, route: &str, status: u16, elapsed: Duration) {
        let route = route.to_owned();
        with_local_recorder(self.recorder.as_ref(), || {
            counter!(REQUESTS_TOTAL, "route" => route.clone(), "status" => status.to_string())
                .increment(1);
            histogram!(REQUEST_DURATION, "route" => route).record(elapsed.as_secs_f64());
        });
    }

    /// Current snapshot in the Prometheus exposition format.
    pub fn render(&self) -> String {
        self.recorder.handle().render()
    }
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}
