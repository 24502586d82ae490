//! A concrete implementation of the metrics sinks using the `prometheus` crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_histogram_vec, register_int_counter_vec, Gauge,
    HistogramVec, IntCounterVec,
};

static WORKER_POLLS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static WORKER_POLL_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static WORKER_ITEMS_PROCESSED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static WORKER_ITEMS_FAILED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static BROADCAST_LATENCY_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static BROADCAST_REVERTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static BROADCAST_SUBMITTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static STORE_QUERY_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static STORE_POOL_SIZE: OnceCell<Gauge> = OnceCell::new();

static INDEXER_QUERY_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static INDEXER_RETRIES_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Panics if `install()` has not been called, which is intentional: it indicates
/// a missing step in process startup, not a recoverable runtime condition.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call relayer_telemetry::prometheus::install() first.")
    };
}

impl WorkerMetricsSink for PrometheusSink {
    fn inc_poll(&self, origin: &str, stage: &str) {
        get_metric!(WORKER_POLLS_TOTAL)
            .with_label_values(&[origin, stage])
            .inc();
    }
    fn observe_poll_duration(&self, origin: &str, stage: &str, duration_secs: f64) {
        get_metric!(WORKER_POLL_DURATION_SECONDS)
            .with_label_values(&[origin, stage])
            .observe(duration_secs);
    }
    fn inc_items_processed(&self, origin: &str, stage: &str, count: u64) {
        get_metric!(WORKER_ITEMS_PROCESSED_TOTAL)
            .with_label_values(&[origin, stage])
            .inc_by(count);
    }
    fn inc_items_failed(&self, origin: &str, stage: &str, kind: &str) {
        get_metric!(WORKER_ITEMS_FAILED_TOTAL)
            .with_label_values(&[origin, stage, kind])
            .inc();
    }
}

impl BroadcastMetricsSink for PrometheusSink {
    fn observe_broadcast_latency(&self, chain: &str, duration_secs: f64) {
        get_metric!(BROADCAST_LATENCY_SECONDS)
            .with_label_values(&[chain])
            .observe(duration_secs);
    }
    fn inc_broadcast_reverted(&self, chain: &str) {
        get_metric!(BROADCAST_REVERTED_TOTAL)
            .with_label_values(&[chain])
            .inc();
    }
    fn inc_broadcast_submitted(&self, chain: &str) {
        get_metric!(BROADCAST_SUBMITTED_TOTAL)
            .with_label_values(&[chain])
            .inc();
    }
}

impl StoreMetricsSink for PrometheusSink {
    fn observe_query_duration(&self, operation: &str, duration_secs: f64) {
        get_metric!(STORE_QUERY_DURATION_SECONDS)
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
    fn set_pool_size(&self, size: f64) {
        get_metric!(STORE_POOL_SIZE).set(size);
    }
}

impl IndexerMetricsSink for PrometheusSink {
    fn observe_query_duration(&self, stream: &str, duration_secs: f64) {
        get_metric!(INDEXER_QUERY_DURATION_SECONDS)
            .with_label_values(&[stream])
            .observe(duration_secs);
    }
    fn inc_retries(&self, stream: &str) {
        get_metric!(INDEXER_RETRIES_TOTAL)
            .with_label_values(&[stream])
            .inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &str, variant: &str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

/// Initializes all Prometheus metric collectors and returns a static reference to
/// the sink. Must be called exactly once at application startup, before any
/// worker is spawned.
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    WORKER_POLLS_TOTAL
        .set(register_int_counter_vec!(
            "relayer_worker_polls_total",
            "Total poll iterations per (origin, stage) worker.",
            &["origin", "stage"]
        )?)
        .expect("static already initialized");
    WORKER_POLL_DURATION_SECONDS
        .set(register_histogram_vec!(
            "relayer_worker_poll_duration_seconds",
            "Wall-clock duration of a single stage handle() call.",
            &["origin", "stage"],
            exponential_buckets(0.005, 2.0, 16)?
        )?)
        .expect("static already initialized");
    WORKER_ITEMS_PROCESSED_TOTAL
        .set(register_int_counter_vec!(
            "relayer_worker_items_processed_total",
            "Total items advanced by a stage without error.",
            &["origin", "stage"]
        )?)
        .expect("static already initialized");
    WORKER_ITEMS_FAILED_TOTAL
        .set(register_int_counter_vec!(
            "relayer_worker_items_failed_total",
            "Total per-item errors raised by a stage, by error kind.",
            &["origin", "stage", "kind"]
        )?)
        .expect("static already initialized");
    BROADCAST_LATENCY_SECONDS
        .set(register_histogram_vec!(
            "relayer_broadcast_latency_seconds",
            "Latency of a signed-sender broadcast, from signing to submission.",
            &["chain"],
            exponential_buckets(0.01, 2.0, 16)?
        )?)
        .expect("static already initialized");
    BROADCAST_REVERTED_TOTAL
        .set(register_int_counter_vec!(
            "relayer_broadcast_reverted_total",
            "Total destination transactions observed as reverted.",
            &["chain"]
        )?)
        .expect("static already initialized");
    BROADCAST_SUBMITTED_TOTAL
        .set(register_int_counter_vec!(
            "relayer_broadcast_submitted_total",
            "Total transactions successfully submitted.",
            &["chain"]
        )?)
        .expect("static already initialized");
    STORE_QUERY_DURATION_SECONDS
        .set(register_histogram_vec!(
            "relayer_store_query_duration_seconds",
            "Latency of transaction store operations.",
            &["operation"],
            exponential_buckets(0.001, 2.0, 14)?
        )?)
        .expect("static already initialized");
    STORE_POOL_SIZE
        .set(register_gauge!(
            "relayer_store_pool_size",
            "Current size of the store's connection pool."
        )?)
        .expect("static already initialized");
    INDEXER_QUERY_DURATION_SECONDS
        .set(register_histogram_vec!(
            "relayer_indexer_query_duration_seconds",
            "Latency of indexer queries, by stream.",
            &["stream"],
            exponential_buckets(0.005, 2.0, 15)?
        )?)
        .expect("static already initialized");
    INDEXER_RETRIES_TOTAL
        .set(register_int_counter_vec!(
            "relayer_indexer_retries_total",
            "Total retried indexer requests, by stream.",
            &["stream"]
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "relayer_errors_total",
            "Total errors, categorized by component kind and variant.",
            &["kind", "variant"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    crate::sinks::SINK.set(&SINK).ok();
    Ok(&SINK)
}
