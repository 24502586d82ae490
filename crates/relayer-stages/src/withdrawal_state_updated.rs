use std::collections::HashMap;

use async_trait::async_trait;
use relayer_types::{BatchStatus, Chain, StageError};

use crate::{StageContext, StageHandler};

/// Watches `Pending` `VaultControllerBatch` rows for the `WithdrawalStateUpdated`
/// event confirming their batch is claimable, and advances them to
/// `ReadyToClaim` (§4.4.5). Has no direct effect on `BridgeMessage`.
pub struct WithdrawalStateUpdated {
    ctx: StageContext,
}

impl WithdrawalStateUpdated {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StageHandler for WithdrawalStateUpdated {
    fn name(&self) -> &'static str {
        "withdrawal_state_updated"
    }

    fn origin(&self) -> Chain {
        Chain::Via
    }

    async fn handle(&self) -> Result<bool, StageError> {
        let batches = self
            .ctx
            .store
            .pending_batches(Chain::Via, self.ctx.batch_size())
            .await?;
        if batches.is_empty() {
            return Ok(false);
        }

        let mut batch_ids_by_l1_batch: HashMap<i64, Vec<i64>> = HashMap::new();
        for batch in &batches {
            batch_ids_by_l1_batch
                .entry(batch.l1_batch_number)
                .or_default()
                .push(batch.id);
        }
        let batch_numbers: Vec<i64> = batch_ids_by_l1_batch.keys().copied().collect();

        let max_block = self.ctx.confirmed_head(Chain::Ethereum).await?;
        let events = self
            .ctx
            .indexer
            .withdrawal_state_events(&batch_numbers, max_block, self.ctx.batch_size())
            .await?;

        let mut progressed = false;
        for event in events {
            let Some(ids) = batch_ids_by_l1_batch.get(&event.l1_batch) else {
                continue;
            };
            for &id in ids {
                match self
                    .ctx
                    .store
                    .update_batch_status(id, BatchStatus::ReadyToClaim)
                    .await
                {
                    Ok(()) => progressed = true,
                    Err(e) => {
                        tracing::error!(target = "stage", stage = self.name(), batch_id = id, error = %e, "failed to advance batch to ready_to_claim");
                    }
                }
            }
        }

        Ok(progressed)
    }
}
