use axum::{
    body::Bytes,
    error_handling::HandleErrorLayer,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderName, StatusCode},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use std::{net::SocketAddr, time::Duration};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

use crate::health::{HealthDetail, HealthSnapshot, HealthState};

async fn metrics_handler() -> ([(HeaderName, String); 1], Bytes) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::with_capacity(1 << 16);
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::error!(error=%e, "failed to encode prometheus metrics");
    }
    (
        [(CONTENT_TYPE, encoder.format_type().to_string())],
        buf.into(),
    )
}

/// Process liveness: always 200 once the HTTP server itself is serving requests.
async fn livez_handler() -> &'static str {
    "OK"
}

/// Readiness: 200 only once the supervisor has finished wiring and is not draining.
async fn readyz_handler(State(health): State<HealthSnapshot>) -> (StatusCode, &'static str) {
    match health.state() {
        HealthState::Ready => (StatusCode::OK, "OK"),
        HealthState::Starting => (StatusCode::SERVICE_UNAVAILABLE, "starting"),
        HealthState::Draining => (StatusCode::SERVICE_UNAVAILABLE, "draining"),
    }
}

/// Detailed per-worker health: last poll timestamp and last observed error.
async fn health_handler(State(health): State<HealthSnapshot>) -> Json<HealthDetail> {
    Json(health.detail())
}

async fn handle_service_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unhandled internal error: {err}"),
        )
    }
}

/// Serves `/metrics`, `/livez`, `/readyz`, and `/health` until `shutdown` fires.
pub async fn run_server(addr: SocketAddr, health: HealthSnapshot, shutdown: CancellationToken) {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/livez", get(livez_handler))
        .route("/readyz", get(readyz_handler))
        .route("/health", get(health_handler))
        .with_state(health)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_service_error))
                .layer(TraceLayer::new_for_http())
                .load_shed()
                .concurrency_limit(8)
                .timeout(Duration::from_secs(2)),
        );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target = "telemetry", error = %e, "failed to bind telemetry http server");
            return;
        }
    };
    let local_addr = listener.local_addr().ok();
    tracing::info!(target = "telemetry", addr = ?local_addr, "listening");

    let graceful = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = signal::ctrl_c() => {}
        }
        tracing::info!(target = "telemetry", "shutting down gracefully");
    });

    if let Err(e) = graceful.await {
        tracing::error!(target = "telemetry", error = %e, "server error");
    }
}
