use alloy_primitives::{Address, B256};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{chain::Chain, status::MessageStatus};

/// The central relayed-message record (§3 `BridgeMessage`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub id: i64,
    pub origin: Chain,
    pub status: MessageStatus,
    pub source_tx_hash: B256,
    pub dest_tx_hash: Option<B256>,
    pub origin_block: i64,
    pub dest_block: Option<i64>,
    pub l1_batch_number: Option<i64>,
    pub payload: Vec<u8>,
    pub event_type: String,
    pub subgraph_id: String,
    pub vault_ctrl_ref: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BridgeMessage {
    /// §3 invariant: `l1BatchNumber` is set only for Via-origin messages that have
    /// progressed past `Finalized`.
    pub fn batch_number_invariant_holds(&self) -> bool {
        match self.l1_batch_number {
            None => true,
            Some(_) => {
                self.origin == Chain::Via
                    && matches!(
                        self.status,
                        MessageStatus::Finalized
                            | MessageStatus::L1BatchFinalized
                            | MessageStatus::VaultUpdated
                    )
            }
        }
    }
}

/// Fields required to create a new `BridgeMessage`; used by `TransactionStore::upsert_message`.
#[derive(Debug, Clone)]
pub struct NewBridgeMessage {
    pub origin: Chain,
    pub status: MessageStatus,
    pub source_tx_hash: B256,
    pub dest_tx_hash: Option<B256>,
    pub origin_block: i64,
    pub dest_block: Option<i64>,
    pub payload: Vec<u8>,
    pub event_type: String,
    pub subgraph_id: String,
}

/// An L1 settlement transaction that aggregates many withdrawals sharing the same
/// `(l1BatchNumber, l1VaultAddress)` (§3 `VaultControllerBatch`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultControllerBatch {
    pub id: i64,
    pub transaction_hash: B256,
    pub l1_batch_number: i64,
    pub l1_vault_address: Address,
    pub total_shares: BigDecimal,
    pub message_hash_count: i64,
    pub status: crate::status::BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new `VaultControllerBatch`; the caller has already
/// computed `total_shares` and `message_hash_count` from the message group.
#[derive(Debug, Clone)]
pub struct NewVaultControllerBatch {
    pub transaction_hash: B256,
    pub l1_batch_number: i64,
    pub l1_vault_address: Address,
    pub total_shares: BigDecimal,
    pub message_hash_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::BatchStatus;

    fn sample(origin: Chain, status: MessageStatus, l1_batch_number: Option<i64>) -> BridgeMessage {
        BridgeMessage {
            id: 1,
            origin,
            status,
            source_tx_hash: B256::repeat_byte(0xAA),
            dest_tx_hash: None,
            origin_block: 100,
            dest_block: None,
            l1_batch_number,
            payload: vec![],
            event_type: "DepositMessageSent".into(),
            subgraph_id: "sub-1".into(),
            vault_ctrl_ref: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn batch_number_requires_via_and_advanced_status() {
        assert!(sample(Chain::Via, MessageStatus::Finalized, Some(42)).batch_number_invariant_holds());
        assert!(!sample(Chain::Ethereum, MessageStatus::Finalized, Some(42))
            .batch_number_invariant_holds());
        assert!(!sample(Chain::Via, MessageStatus::Pending, Some(42)).batch_number_invariant_holds());
        assert!(sample(Chain::Ethereum, MessageStatus::Pending, None).batch_number_invariant_holds());
    }

    #[test]
    fn batch_message_hash_count_invariant() {
        let batch = VaultControllerBatch {
            id: 1,
            transaction_hash: B256::repeat_byte(0x11),
            l1_batch_number: 42,
            l1_vault_address: Address::repeat_byte(0x22),
            total_shares: BigDecimal::from(500),
            message_hash_count: 1,
            status: BatchStatus::ReadyToClaim,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(batch.message_hash_count, 1);
    }
}
