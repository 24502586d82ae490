use std::sync::Arc;
use std::time::{Duration, Instant};

use relayer_stages::StageHandler;
use relayer_telemetry::{metrics, HealthSnapshot};
use tokio_util::sync::CancellationToken;

/// Drives one stage handler's `loop { progressed := handle(); sleep unless
/// progressed; check cancellation }` (§5). Each `(origin, stage)` pair gets its
/// own `PollWorker` and its own tokio task — no worker ever blocks another.
pub struct PollWorker {
    stage: Arc<dyn StageHandler>,
    poll_interval: Duration,
    health: HealthSnapshot,
    cancel: CancellationToken,
}

impl PollWorker {
    pub fn new(
        stage: Arc<dyn StageHandler>,
        poll_interval: Duration,
        health: HealthSnapshot,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            stage,
            poll_interval,
            health,
            cancel,
        }
    }

    fn worker_key(&self) -> String {
        format!("{}.{}", self.stage.origin(), self.stage.name())
    }

    pub async fn run(self) {
        let key = self.worker_key();
        let origin = self.stage.origin().as_str();
        let stage_name = self.stage.name();
        tracing::info!(target = "worker", origin, stage = stage_name, "worker starting");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.health.record_poll(&key);
            metrics().inc_poll(origin, stage_name);
            let start = Instant::now();
            let result = self.stage.handle().await;
            metrics().observe_poll_duration(origin, stage_name, start.elapsed().as_secs_f64());

            let progressed = match result {
                Ok(progressed) => progressed,
                Err(e) => {
                    metrics().inc_items_failed(origin, stage_name, e.kind());
                    self.health.record_error(&key, e.to_string());
                    tracing::warn!(target = "worker", origin, stage = stage_name, error = %e, "stage batch failed, will retry after sleeping");
                    false
                }
            };

            if progressed {
                // Useful work was done — poll again immediately rather than sleeping.
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.cancel.cancelled() => break,
            }
        }

        tracing::info!(target = "worker", origin, stage = stage_name, "worker stopped");
    }
}
