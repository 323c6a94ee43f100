//! Metrics and observability utilities
//!
//! Thin helpers over the `metrics` facade with standardized naming. The
//! search binary installs a Prometheus exporter; without a recorder these
//! calls are no-ops.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all FilingForge metrics
pub const METRICS_PREFIX: &str = "filingforge";

/// Histogram buckets for search latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005,
    0.010,
    0.025,
    0.050,
    0.100,
    0.250,
    0.500,
    1.000,
    2.500,
    5.000,
];

/// Buckets for embedding latency (typically slower)
pub const EMBEDDING_BUCKETS: &[f64] = &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 30.00];

/// Register all metric descriptions
pub fn register_metrics() {
    // Ingestion metrics
    describe_counter!(
        format!("{}_documents_total", METRICS_PREFIX),
        Unit::Count,
        "Documents seen by the ingestion pipeline, by outcome"
    );

    describe_counter!(
        format!("{}_chunks_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks created"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Batch ingestion latency in seconds"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_batches_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding batches"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding errors"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    // Store metrics
    describe_counter!(
        format!("{}_snapshot_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Snapshot writes, by status"
    );

    describe_gauge!(
        format!("{}_store_records", METRICS_PREFIX),
        Unit::Count,
        "Records held by the store"
    );

    tracing::info!("Metrics registered");
}

/// Record search metrics; `policy` is the store path or the routed query shape
pub fn record_search(duration_secs: f64, policy: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "policy" => policy.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "policy" => policy.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "policy" => policy.to_string()
    )
    .set(result_count as f64);
}

/// Record one embedding batch
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_batches_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(batch_size as u64);
    }
}

/// Outcome of one document in an ingestion batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    Processed,
    Skipped,
    Errored,
}

impl DocumentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentOutcome::Processed => "processed",
            DocumentOutcome::Skipped => "skipped",
            DocumentOutcome::Errored => "errored",
        }
    }
}

/// Record one ingested document
pub fn record_document(outcome: DocumentOutcome, doc_type: &str, chunks_created: usize) {
    counter!(
        format!("{}_documents_total", METRICS_PREFIX),
        "outcome" => outcome.as_str(),
        "doc_type" => doc_type.to_string()
    )
    .increment(1);

    if chunks_created > 0 {
        counter!(
            format!("{}_chunks_created_total", METRICS_PREFIX),
            "doc_type" => doc_type.to_string()
        )
        .increment(chunks_created as u64);
    }
}

/// Record a completed ingestion batch
pub fn record_ingestion(duration_secs: f64) {
    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a snapshot write and the resulting record count
pub fn record_snapshot(success: bool, records: usize) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_snapshot_writes_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    gauge!(format!("{}_store_records", METRICS_PREFIX)).set(records as f64);
}
