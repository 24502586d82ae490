use async_trait::async_trait;
use relayer_chain::ReceiptStatus;
use relayer_types::{BatchStatus, Chain, MessageStatus, StageError};

use crate::{StageContext, StageHandler};

/// Sweeps `Pending` rows that have aged past the configured timeout and
/// resolves them by directly checking the destination chain's receipt (§4.4.7,
/// C7). Covers both `BridgeMessage` (every origin) and, for `origin = Via`,
/// `VaultControllerBatch` (the L1 settlement side never has its own dedicated
/// advancing stage beyond `VaultControllerUpdate`'s initial broadcast).
pub struct StalePendingReconciler {
    ctx: StageContext,
    origin: Chain,
}

impl StalePendingReconciler {
    pub fn new(ctx: StageContext, origin: Chain) -> Self {
        Self { ctx, origin }
    }

    async fn reconcile_messages(&self) -> Result<bool, StageError> {
        let dest = self.origin.counterparty();
        let stale = self
            .ctx
            .store
            .stale_pending(self.origin, self.ctx.config.pending_tx_timeout, self.ctx.batch_size())
            .await?;

        let mut progressed = false;
        for message in stale {
            let Some(dest_tx_hash) = message.dest_tx_hash else {
                continue;
            };
            let receipt = match self.ctx.sender.receipt(dest, dest_tx_hash).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    tracing::warn!(target = "stage", stage = self.name(), message_id = message.id, error = %e, "receipt lookup failed, will retry next sweep");
                    continue;
                }
            };

            let outcome = match receipt {
                None => self
                    .ctx
                    .store
                    .update_status_batch(&[message.id], MessageStatus::Failed)
                    .await,
                Some(r) if r.status == ReceiptStatus::Success => {
                    self.ctx.store.finalize_message(message.id, r.block_number as i64).await
                }
                Some(_) => {
                    self.ctx
                        .store
                        .update_status_batch(&[message.id], MessageStatus::Failed)
                        .await
                }
            };

            match outcome {
                Ok(()) => progressed = true,
                Err(e) => {
                    tracing::error!(target = "stage", stage = self.name(), message_id = message.id, error = %e, "failed to reconcile stale message");
                }
            }
        }
        Ok(progressed)
    }

    async fn reconcile_vault_batches(&self) -> Result<bool, StageError> {
        let stale = self
            .ctx
            .store
            .stale_pending_batches(self.ctx.config.pending_tx_timeout, self.ctx.batch_size())
            .await?;

        let mut progressed = false;
        for batch in stale {
            let receipt = match self.ctx.sender.receipt(Chain::Ethereum, batch.transaction_hash).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    tracing::warn!(target = "stage", stage = self.name(), batch_id = batch.id, error = %e, "receipt lookup failed, will retry next sweep");
                    continue;
                }
            };

            let new_status = match receipt {
                None => BatchStatus::Failed,
                Some(r) if r.status == ReceiptStatus::Success => BatchStatus::Confirmed,
                Some(_) => BatchStatus::Failed,
            };

            match self.ctx.store.update_batch_status(batch.id, new_status).await {
                Ok(()) => progressed = true,
                Err(e) => {
                    tracing::error!(target = "stage", stage = self.name(), batch_id = batch.id, error = %e, "failed to reconcile stale batch");
                }
            }
        }
        Ok(progressed)
    }
}

#[async_trait]
impl StageHandler for StalePendingReconciler {
    fn name(&self) -> &'static str {
        "stale_pending_reconciler"
    }

    fn origin(&self) -> Chain {
        self.origin
    }

    async fn handle(&self) -> Result<bool, StageError> {
        let mut progressed = self.reconcile_messages().await?;
        if self.origin == Chain::Via {
            progressed |= self.reconcile_vault_batches().await?;
        }
        Ok(progressed)
    }
}
