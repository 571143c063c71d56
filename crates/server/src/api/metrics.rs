//! Prometheus metrics recording.

use metrics::{counter, histogram};
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records a search execution by mode, with its result count.
pub fn record_search(mode: &str, results: usize) {
    counter!("cinesearch_searches_total", "mode" => mode.to_string()).increment(1);
    histogram!("cinesearch_search_results", "mode" => mode.to_string()).record(results as f64);
}
