use alloy_sol_types::SolCall;
use async_trait::async_trait;
use relayer_indexer::EventStream;
use relayer_types::{Chain, MessageStatus, NewBridgeMessage, StageError};

use crate::contracts::IBridge;
use crate::{StageContext, StageHandler};

/// The human-readable `eventType` tag stamped on the stored row (§3):
/// Ethereum-origin messages are deposits into Via, Via-origin messages are
/// withdrawals back to Ethereum.
fn event_type_for(origin: Chain) -> &'static str {
    match origin {
        Chain::Ethereum => "DepositMessageSent",
        Chain::Via => "WithdrawalSent",
    }
}

/// Observes `MessageSent` on `origin` and broadcasts the corresponding
/// `receiveMessage` on the destination chain (§4.4.1).
pub struct BridgeInitiated {
    ctx: StageContext,
    origin: Chain,
}

impl BridgeInitiated {
    pub fn new(ctx: StageContext, origin: Chain) -> Self {
        Self { ctx, origin }
    }
}

#[async_trait]
impl StageHandler for BridgeInitiated {
    fn name(&self) -> &'static str {
        "bridge_initiated"
    }

    fn origin(&self) -> Chain {
        self.origin
    }

    async fn handle(&self) -> Result<bool, StageError> {
        let origin = self.origin;
        let dest = origin.counterparty();

        let from_block = self.ctx.store.last_origin_block(origin).await? + 1;
        let to_block = self.ctx.confirmed_head(origin).await?;
        if from_block > to_block {
            return Ok(false);
        }

        let events = self
            .ctx
            .indexer
            .message_sent_events(
                EventStream::MessageSent(origin),
                from_block,
                to_block,
                self.ctx.batch_size(),
            )
            .await?;

        let mut progressed = false;
        for event in events {
            let source_hash: [u8; 32] = event.transaction_hash.0;
            match self.ctx.store.find_by_source_hash(&source_hash).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target = "stage", stage = self.name(), %origin, error = %e, "store lookup failed, skipping item");
                    continue;
                }
            }

            let calldata = IBridge::receiveMessageCall {
                payload: event.payload.clone().into(),
            }
            .abi_encode();

            let dest_tx_hash = match self
                .ctx
                .sender
                .send_contract_call(dest, self.ctx.bridge_address(dest), calldata.into())
                .await
            {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::warn!(
                        target = "stage", stage = self.name(), %origin,
                        source_tx_hash = %event.transaction_hash, error = %e,
                        "broadcast failed, will retry on next poll"
                    );
                    continue;
                }
            };

            let inserted = self
                .ctx
                .store
                .upsert_message(NewBridgeMessage {
                    origin,
                    status: MessageStatus::Pending,
                    source_tx_hash: event.transaction_hash,
                    dest_tx_hash: Some(dest_tx_hash),
                    origin_block: event.block_number,
                    dest_block: None,
                    payload: event.payload,
                    event_type: event_type_for(origin).into(),
                    subgraph_id: event.id.clone(),
                })
                .await;

            match inserted {
                Ok(_) => progressed = true,
                Err(e) => {
                    tracing::error!(
                        target = "stage", stage = self.name(), %origin,
                        source_tx_hash = %event.transaction_hash, dest_tx_hash = %dest_tx_hash, error = %e,
                        "broadcast succeeded but store insert failed; next poll will re-broadcast"
                    );
                }
            }
        }

        Ok(progressed)
    }
}
