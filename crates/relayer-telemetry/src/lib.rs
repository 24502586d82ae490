#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Observability infrastructure for the bridge relayer: structured logging
//! initialization, a Prometheus metrics endpoint, and abstract sinks decoupling
//! stage/worker instrumentation from the metrics backend.

/// A lightweight HTTP server exposing `/metrics`, `/livez`, `/readyz`, and `/health`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) decoupling instrumentation from the backend.
pub mod sinks;
/// The process-wide health snapshot consulted by `/readyz` and `/health`.
pub mod health;

pub use health::{HealthSnapshot, HealthState, WorkerHealth};
pub use sinks::metrics;
