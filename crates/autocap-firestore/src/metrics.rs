//! Document store metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Store requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "document_store_requests_total";

    /// Retried store requests by operation.
    pub const RETRIES_TOTAL: &str = "document_store_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "document_store_latency_seconds";

    /// Documents returned by queries, by collection.
    pub const QUERY_RESULTS_TOTAL: &str = "document_store_query_results_total";
}

pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "operation" => operation.to_string())
        .record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_query_results(collection: &str, count: usize) {
    counter!(names::QUERY_RESULTS_TOTAL, "collection" => collection.to_string())
        .increment(count as u64);
}
