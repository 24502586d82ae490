use async_trait::async_trait;
use relayer_types::{Chain, StageError};
use serde_json::json;

use crate::{StageContext, StageHandler};

/// Stamps `l1BatchNumber` onto Via-origin messages once their L2 receipt
/// reports one (§4.4.3). Via-specific: `eth_getTransactionReceipt` on a zkSync
/// Era-style chain carries an extra `l1BatchNumber` field standard receipts
/// don't model, so this goes through the raw RPC escape hatch rather than
/// `SignedSender::receipt`.
pub struct L1BatchNumber {
    ctx: StageContext,
}

impl L1BatchNumber {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StageHandler for L1BatchNumber {
    fn name(&self) -> &'static str {
        "l1_batch_number"
    }

    fn origin(&self) -> Chain {
        Chain::Via
    }

    async fn handle(&self) -> Result<bool, StageError> {
        let messages = self
            .ctx
            .store
            .messages_missing_batch_number(Chain::Via, self.ctx.batch_size())
            .await?;

        let mut progressed = false;
        for message in messages {
            let response = match self
                .ctx
                .sender
                .raw_rpc(
                    Chain::Via,
                    "eth_getTransactionReceipt",
                    json!([format!("{:#x}", message.source_tx_hash)]),
                )
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(target = "stage", stage = self.name(), message_id = message.id, error = %e, "raw rpc failed, skipping item");
                    continue;
                }
            };

            let l1_batch_number = response
                .get("l1BatchNumber")
                .and_then(|v| v.as_str())
                .and_then(|s| i64::from_str_radix(s.trim_start_matches("0x"), 16).ok());

            let Some(l1_batch_number) = l1_batch_number else {
                // Not yet included in an L1 batch — not an error.
                continue;
            };

            match self
                .ctx
                .store
                .stamp_l1_batch_number(message.id, l1_batch_number)
                .await
            {
                Ok(()) => progressed = true,
                Err(e) => {
                    tracing::error!(target = "stage", stage = self.name(), message_id = message.id, error = %e, "failed to stamp l1 batch number");
                }
            }
        }

        Ok(progressed)
    }
}
