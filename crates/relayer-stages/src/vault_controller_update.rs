use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use relayer_chain::decimal_to_u256;
use relayer_indexer::EventStream;
use relayer_types::{message_hash, BridgeMessage, Chain, MessageStatus, NewVaultControllerBatch, StageError};

use crate::contracts::IVaultController;
use crate::{StageContext, StageHandler};

const RECEIPT_POLL_ATTEMPTS: u32 = 30;
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Groups Via-origin messages that have both a batch number and an observed L1
/// withdrawal execution, settles them on the vault contract in one call per
/// `(l1BatchNumber, l1VaultAddress)` group, and advances them to `VaultUpdated`
/// (§4.4.4).
pub struct VaultControllerUpdate {
    ctx: StageContext,
}

impl VaultControllerUpdate {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    async fn wait_for_success_receipt(&self, tx_hash: B256) -> Result<(), StageError> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            if let Some(receipt) = self.ctx.sender.receipt(Chain::Ethereum, tx_hash).await? {
                return match receipt.status {
                    relayer_chain::ReceiptStatus::Success => Ok(()),
                    relayer_chain::ReceiptStatus::Reverted => Err(StageError::BroadcastReverted {
                        tx_hash: format!("{tx_hash:#x}"),
                    }),
                };
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
        Err(StageError::Unexpected(format!(
            "receipt for {tx_hash:#x} not observed within the poll budget"
        )))
    }
}

#[async_trait]
impl StageHandler for VaultControllerUpdate {
    fn name(&self) -> &'static str {
        "vault_controller_update"
    }

    fn origin(&self) -> Chain {
        Chain::Via
    }

    async fn handle(&self) -> Result<bool, StageError> {
        let messages = self
            .ctx
            .store
            .messages_with_batch_number(Chain::Via, self.ctx.batch_size())
            .await?;
        if messages.is_empty() {
            return Ok(false);
        }

        let dest_hashes: Vec<B256> = messages.iter().filter_map(|m| m.dest_tx_hash).collect();
        let executed = self
            .ctx
            .indexer
            .executed_events_by_tx_hashes(EventStream::Executed(Chain::Ethereum), &dest_hashes)
            .await?;
        let executed_by_hash: HashMap<B256, _> =
            executed.into_iter().map(|e| (e.transaction_hash, e)).collect();

        // Group by (l1BatchNumber, l1VaultAddress).
        let mut groups: HashMap<(i64, Address), Vec<(BridgeMessage, B256)>> = HashMap::new();
        for message in messages {
            let Some(dest_hash) = message.dest_tx_hash else {
                continue;
            };
            let Some(executed) = executed_by_hash.get(&dest_hash) else {
                tracing::warn!(
                    target = "stage", stage = self.name(), message_id = message.id,
                    dest_tx_hash = %dest_hash, "no matching withdrawal-executed event yet, skipping"
                );
                continue;
            };
            let Some(l1_batch_number) = message.l1_batch_number else {
                continue;
            };
            let message_hash = message_hash(
                executed.vault_nonce,
                executed.vault,
                executed.receiver,
                decimal_shares_to_u256(&executed.shares)?,
            );
            groups
                .entry((l1_batch_number, executed.vault))
                .or_default()
                .push((message, message_hash));
        }

        let mut progressed = false;
        for ((l1_batch_number, l1_vault_address), group) in groups {
            let ids: Vec<i64> = group.iter().map(|(m, _)| m.id).collect();
            let hashes: Vec<B256> = group.iter().map(|(_, h)| *h).collect();
            let total_shares: BigDecimal = group
                .iter()
                .filter_map(|(m, _)| executed_by_hash.get(&m.dest_tx_hash?))
                .map(|e| e.shares.clone())
                .sum();

            let calldata = IVaultController::updateWithdrawalStateCall {
                messageHashes: hashes,
                l1BatchNumber: U256::from(l1_batch_number),
                totalShares: decimal_shares_to_u256(&total_shares)?,
            }
            .abi_encode();

            let tx_hash = match self
                .ctx
                .sender
                .send_contract_call(Chain::Ethereum, l1_vault_address, calldata.into())
                .await
            {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::warn!(
                        target = "stage", stage = self.name(), l1_batch_number, %l1_vault_address, error = %e,
                        "vault update broadcast failed, will retry next poll"
                    );
                    continue;
                }
            };

            if let Err(e) = self.wait_for_success_receipt(tx_hash).await {
                tracing::error!(
                    target = "stage", stage = self.name(), l1_batch_number, %l1_vault_address, %tx_hash, error = %e,
                    "vault update transaction did not succeed; messages remain Finalized"
                );
                continue;
            }

            let batch = match self
                .ctx
                .store
                .create_batch(NewVaultControllerBatch {
                    transaction_hash: tx_hash,
                    l1_batch_number,
                    l1_vault_address,
                    total_shares,
                    message_hash_count: ids.len() as i64,
                })
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!(target = "stage", stage = self.name(), %tx_hash, error = %e, "failed to record vault controller batch");
                    continue;
                }
            };

            if let Err(e) = self
                .ctx
                .store
                .link_to_batch_and_advance(&ids, batch.id, MessageStatus::VaultUpdated)
                .await
            {
                tracing::error!(target = "stage", stage = self.name(), batch_id = batch.id, error = %e, "failed to link messages to batch");
                continue;
            }
            progressed = true;
        }

        Ok(progressed)
    }
}

fn decimal_shares_to_u256(value: &BigDecimal) -> Result<U256, StageError> {
    decimal_to_u256(value).map_err(StageError::Rpc)
}
