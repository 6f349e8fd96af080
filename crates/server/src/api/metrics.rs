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

/// Records one call to the vector store.
pub fn record_store_operation(operation: &str, ok: bool, duration: Duration) {
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", if ok { "ok" } else { "error" }.to_string()),
    ];
    counter!("picsearch_store_operations_total", &labels).increment(1);
    histogram!("picsearch_store_operation_seconds", &labels).record(duration.as_secs_f64());
}

/// Records one call to the embedding service.
pub fn record_embedding_call(endpoint: &str, status: u16, duration: Duration) {
    let labels = [
        ("endpoint", endpoint.to_string()),
        ("status", status.to_string()),
    ];
    counter!("picsearch_embedding_requests_total", &labels).increment(1);
    histogram!("picsearch_embedding_request_seconds", &labels).record(duration.as_secs_f64());
}

/// Records a completed search.
pub fn record_search_operation(collection: &str, mode: &str) {
    counter!(
        "picsearch_search_total",
        "collection" => collection.to_string(),
        "mode" => mode.to_string()
    )
    .increment(1);
}

/// Records rows inserted by an ingestion run.
pub fn record_ingested(collection: &str, rows: usize) {
    counter!(
        "picsearch_ingested_records_total",
        "collection" => collection.to_string()
    )
    .increment(rows as u64);
}

/// Records a request that failed with a domain error.
pub fn record_failure(operation: &str, kind: &str) {
    counter!(
        "picsearch_failures_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}
