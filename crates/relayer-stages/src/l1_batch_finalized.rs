use std::collections::HashMap;

use alloy_primitives::B256;
use async_trait::async_trait;
use relayer_types::{Chain, MessageStatus, StageError};
use serde_json::json;

use crate::{StageContext, StageHandler};

fn is_zero_hash(hash: &str) -> bool {
    hash.trim_start_matches("0x").chars().all(|c| c == '0')
}

/// Optional stage (§4.4.6, can be left un-instantiated by a deployment that
/// doesn't need it): watches L1 batches containing `Finalized`/`VaultUpdated`
/// messages for their L1 execution transaction, and advances them to the
/// terminal `L1BatchFinalized` status.
pub struct L1BatchFinalized {
    ctx: StageContext,
}

impl L1BatchFinalized {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StageHandler for L1BatchFinalized {
    fn name(&self) -> &'static str {
        "l1_batch_finalized"
    }

    fn origin(&self) -> Chain {
        Chain::Via
    }

    async fn handle(&self) -> Result<bool, StageError> {
        let mut ids_by_l1_batch: HashMap<i64, Vec<i64>> = HashMap::new();
        for status in [MessageStatus::Finalized, MessageStatus::VaultUpdated] {
            let rows = self
                .ctx
                .store
                .messages_by_status(status, Chain::Via, self.ctx.batch_size(), None)
                .await?;
            for row in rows {
                if let Some(l1_batch_number) = row.l1_batch_number {
                    ids_by_l1_batch.entry(l1_batch_number).or_default().push(row.id);
                }
            }
        }
        if ids_by_l1_batch.is_empty() {
            return Ok(false);
        }

        let mut progressed = false;
        for (l1_batch_number, ids) in ids_by_l1_batch {
            let response = match self
                .ctx
                .sender
                .raw_rpc(
                    Chain::Via,
                    "zks_getL1BatchDetails",
                    json!([l1_batch_number]),
                )
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(target = "stage", stage = self.name(), l1_batch_number, error = %e, "raw rpc failed, skipping batch");
                    continue;
                }
            };

            let execute_tx_hash = response.get("executeTxHash").and_then(|v| v.as_str());
            let executed = matches!(
                execute_tx_hash,
                Some(hash) if hash.parse::<B256>().is_ok() && !is_zero_hash(hash)
            );
            if !executed {
                continue;
            }

            match self
                .ctx
                .store
                .update_status_batch(&ids, MessageStatus::L1BatchFinalized)
                .await
            {
                Ok(()) => progressed = true,
                Err(e) => {
                    tracing::error!(target = "stage", stage = self.name(), l1_batch_number, error = %e, "failed to advance messages to l1_batch_finalized");
                }
            }
        }

        Ok(progressed)
    }
}
