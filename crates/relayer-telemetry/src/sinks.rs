//! Defines abstract traits for metrics reporting, decoupling stage/worker logic
//! from the metrics backend.

use once_cell::sync::OnceCell;

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured metrics sink, or a no-op sink if
/// `prometheus::install()` has not been called (e.g. in unit tests).
pub fn metrics() -> &'static dyn MetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// A sink for metrics related to the worker runtime (§4.5, C5).
pub trait WorkerMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the number of poll iterations for a `(origin, stage)` worker.
    fn inc_poll(&self, origin: &str, stage: &str);
    /// Observes the wall-clock duration of one `handle()` call.
    fn observe_poll_duration(&self, origin: &str, stage: &str, duration_secs: f64);
    /// Increments the number of items processed without error.
    fn inc_items_processed(&self, origin: &str, stage: &str, count: u64);
    /// Increments the number of items that raised a per-item error.
    fn inc_items_failed(&self, origin: &str, stage: &str, kind: &str);
}
impl WorkerMetricsSink for NopSink {
    fn inc_poll(&self, _origin: &str, _stage: &str) {}
    fn observe_poll_duration(&self, _origin: &str, _stage: &str, _duration_secs: f64) {}
    fn inc_items_processed(&self, _origin: &str, _stage: &str, _count: u64) {}
    fn inc_items_failed(&self, _origin: &str, _stage: &str, _kind: &str) {}
}

/// A sink for metrics related to the signed-sender / broadcast path (C3).
pub trait BroadcastMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of a single broadcast, from signing through submission.
    fn observe_broadcast_latency(&self, chain: &str, duration_secs: f64);
    /// Increments the count of reverted destination transactions.
    fn inc_broadcast_reverted(&self, chain: &str);
    /// Increments the count of transactions broadcast successfully.
    fn inc_broadcast_submitted(&self, chain: &str);
}
impl BroadcastMetricsSink for NopSink {
    fn observe_broadcast_latency(&self, _chain: &str, _duration_secs: f64) {}
    fn inc_broadcast_reverted(&self, _chain: &str) {}
    fn inc_broadcast_submitted(&self, _chain: &str) {}
}

/// A sink for metrics related to the transaction store (C2).
pub trait StoreMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of a store call, labeled by operation name.
    fn observe_query_duration(&self, operation: &str, duration_secs: f64);
    /// Sets the gauge for the size of the live connection pool.
    fn set_pool_size(&self, size: f64);
}
impl StoreMetricsSink for NopSink {
    fn observe_query_duration(&self, _operation: &str, _duration_secs: f64) {}
    fn set_pool_size(&self, _size: f64) {}
}

/// A sink for metrics related to the indexer/event-source backend (C1).
pub trait IndexerMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of an indexer query.
    fn observe_query_duration(&self, stream: &str, duration_secs: f64);
    /// Increments the count of retried indexer requests.
    fn inc_retries(&self, stream: &str);
}
impl IndexerMetricsSink for NopSink {
    fn observe_query_duration(&self, _stream: &str, _duration_secs: f64) {}
    fn inc_retries(&self, _stream: &str) {}
}

/// A sink for recording structured error metrics, categorized by component kind.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    fn inc_error(&self, kind: &str, variant: &str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &str, _variant: &str) {}
}

/// A unified sink implementing all domain-specific traits; the single
/// implementation point for metrics backends such as Prometheus.
pub trait MetricsSink:
    WorkerMetricsSink + BroadcastMetricsSink + StoreMetricsSink + IndexerMetricsSink + ErrorMetricsSink
{
}

impl<T> MetricsSink for T where
    T: WorkerMetricsSink
        + BroadcastMetricsSink
        + StoreMetricsSink
        + IndexerMetricsSink
        + ErrorMetricsSink
{
}
