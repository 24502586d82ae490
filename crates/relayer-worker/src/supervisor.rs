use std::sync::Arc;
use std::time::Duration;

use relayer_chain::AlloySignedSender;
use relayer_config::{IndexerBackendConfig, RelayerConfig};
use relayer_indexer::{EventSource, HttpEventSource, SqlEventSource};
use relayer_stages::{
    BridgeFinalize, BridgeInitiated, L1BatchFinalized, L1BatchNumber, StageContext, StageHandler,
    StalePendingReconciler, VaultControllerUpdate, WithdrawalStateUpdated,
};
use relayer_store::{PgTransactionStore, TransactionStore};
use relayer_types::Chain;
use tokio_util::sync::CancellationToken;

use crate::PollWorker;

/// Hard cap on how long shutdown waits for in-flight worker iterations before
/// the process exits non-gracefully (§4.6).
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Assembles every component from `config` and runs until a termination signal
/// is received (§4.6). Tracing is assumed to already be initialized by the
/// caller — config loading and logging bootstrap happen before telemetry can
/// depend on either.
pub async fn run(config: RelayerConfig) -> anyhow::Result<()> {
    let health = relayer_telemetry::HealthSnapshot::new();
    let sink = relayer_telemetry::prometheus::install()?;
    let _ = sink;

    let http_shutdown = CancellationToken::new();
    let metrics_addr: std::net::SocketAddr = config.metrics_addr.parse()?;
    let http_handle = tokio::spawn(relayer_telemetry::http::run_server(
        metrics_addr,
        health.clone(),
        http_shutdown.clone(),
    ));

    tracing::info!(target = "supervisor", "opening transaction store");
    let store: Arc<dyn TransactionStore> = Arc::new(
        PgTransactionStore::connect(&config.store.database_url, config.store.pool_size).await?,
    );

    tracing::info!(target = "supervisor", "opening indexer backend");
    let indexer: Arc<dyn EventSource> = match &config.indexer {
        IndexerBackendConfig::Sql { database_url } => {
            Arc::new(SqlEventSource::connect(database_url).await?)
        }
        IndexerBackendConfig::Http { url, api_key } => Arc::new(HttpEventSource::new(
            url.clone(),
            api_key.clone(),
            config.rpc_request_timeout,
            config.indexer_retry_attempts as usize,
        )),
    };

    tracing::info!(target = "supervisor", "constructing signed sender");
    let sender = Arc::new(AlloySignedSender::new(&config).await?);

    let config = Arc::new(config);
    let ctx = StageContext::new(store.clone(), indexer.clone(), sender.clone(), config.clone());

    let cancel = CancellationToken::new();
    let mut handles = Vec::new();
    for stage in build_stages(ctx) {
        let worker = PollWorker::new(stage, config.worker_polling_interval, health.clone(), cancel.clone());
        handles.push(tokio::spawn(worker.run()));
    }

    health.set_state(relayer_telemetry::HealthState::Ready);
    tracing::info!(target = "supervisor", workers = handles.len(), "all workers started, marking ready");

    wait_for_shutdown_signal().await;
    tracing::info!(target = "supervisor", "shutdown signal received, draining");
    health.set_state(relayer_telemetry::HealthState::Draining);
    http_shutdown.cancel();
    cancel.cancel();

    let drain = futures_join_all(handles);
    if tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, drain).await.is_err() {
        tracing::warn!(target = "supervisor", "shutdown grace period elapsed, exiting without waiting further");
    }
    let _ = http_handle.await;

    tracing::info!(target = "supervisor", "shutdown complete");
    Ok(())
}

/// One `StageHandler` per `(stage, origin)` pair that applies (§5): three for
/// Ethereum, six for Via (`L1BatchFinalized` included — a deployment that
/// doesn't need it simply never observes an `executeTxHash`, and the worker's
/// polling loop is an inexpensive no-op).
fn build_stages(ctx: StageContext) -> Vec<Arc<dyn StageHandler>> {
    vec![
        Arc::new(BridgeInitiated::new(ctx.clone(), Chain::Ethereum)),
        Arc::new(BridgeInitiated::new(ctx.clone(), Chain::Via)),
        Arc::new(BridgeFinalize::new(ctx.clone(), Chain::Ethereum)),
        Arc::new(BridgeFinalize::new(ctx.clone(), Chain::Via)),
        Arc::new(StalePendingReconciler::new(ctx.clone(), Chain::Ethereum)),
        Arc::new(StalePendingReconciler::new(ctx.clone(), Chain::Via)),
        Arc::new(L1BatchNumber::new(ctx.clone())),
        Arc::new(VaultControllerUpdate::new(ctx.clone())),
        Arc::new(WithdrawalStateUpdated::new(ctx.clone())),
        Arc::new(L1BatchFinalized::new(ctx)),
    ]
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let sigterm = signal(SignalKind::terminate());
        let sighup = signal(SignalKind::hangup());
        match (sigterm, sighup) {
            (Ok(mut sigterm), Ok(mut sighup)) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                    _ = sighup.recv() => {}
                }
            }
            _ => {
                tracing::warn!(target = "supervisor", "failed to register unix signal handlers, falling back to ctrl_c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn futures_join_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}
