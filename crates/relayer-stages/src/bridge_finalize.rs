use async_trait::async_trait;
use relayer_indexer::EventStream;
use relayer_types::{Chain, MessageStatus, StageError};

use crate::{StageContext, StageHandler};

/// Observes `…Executed` events on `origin`'s destination chain and advances the
/// matching `Pending` message to `Finalized` (§4.4.2).
pub struct BridgeFinalize {
    ctx: StageContext,
    origin: Chain,
}

impl BridgeFinalize {
    pub fn new(ctx: StageContext, origin: Chain) -> Self {
        Self { ctx, origin }
    }
}

#[async_trait]
impl StageHandler for BridgeFinalize {
    fn name(&self) -> &'static str {
        "bridge_finalize"
    }

    fn origin(&self) -> Chain {
        self.origin
    }

    async fn handle(&self) -> Result<bool, StageError> {
        let origin = self.origin;
        let dest = origin.counterparty();

        // Exclusive lower bound: lastDestBlock itself has already been processed.
        let from_block = self.ctx.store.last_dest_block(origin).await?;
        let to_block = self.ctx.confirmed_head(dest).await?;
        if from_block >= to_block {
            return Ok(false);
        }

        let events = self
            .ctx
            .indexer
            .executed_events(
                EventStream::Executed(dest),
                from_block,
                to_block,
                self.ctx.batch_size(),
            )
            .await?;

        let mut progressed = false;
        for event in events {
            let dest_hash: [u8; 32] = event.transaction_hash.0;
            let row = match self.ctx.store.find_by_dest_hash(&dest_hash).await {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(target = "stage", stage = self.name(), %origin, error = %e, "store lookup failed, skipping item");
                    continue;
                }
            };
            let Some(row) = row else {
                // Belongs to another relayer instance, or predates our cursor.
                continue;
            };
            if row.status != MessageStatus::Pending {
                continue;
            }

            match self
                .ctx
                .store
                .finalize_message(row.id, event.block_number)
                .await
            {
                Ok(()) => progressed = true,
                Err(e) => {
                    tracing::error!(
                        target = "stage", stage = self.name(), %origin, message_id = row.id, error = %e,
                        "failed to finalize message"
                    );
                }
            }
        }

        Ok(progressed)
    }
}
