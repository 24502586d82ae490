use alloy_primitives::{Address, B256, U256};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `MessageSent` event, observed on either chain by `BridgeInitiated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSent {
    pub id: String,
    pub block_number: i64,
    pub transaction_hash: B256,
    pub block_timestamp: DateTime<Utc>,
    pub payload: Vec<u8>,
}

/// A `DepositExecuted` or `MessageWithdrawalExecuted` event, observed by `BridgeFinalize`
/// and (on Via) resolved again by `VaultControllerUpdate` for its withdrawal fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositOrWithdrawalExecuted {
    pub id: String,
    pub block_number: i64,
    pub transaction_hash: B256,
    pub vault_nonce: U256,
    pub vault: Address,
    pub receiver: Address,
    pub shares: BigDecimal,
}

/// A `WithdrawalStateUpdated` event, observed by the stage of the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalStateUpdated {
    pub id: String,
    pub block_number: i64,
    pub transaction_hash: B256,
    pub l1_batch: i64,
    pub exchange_rate: BigDecimal,
    pub message_count: i64,
}

/// The union of event kinds a stage handler might request from `EventSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IndexerEvent {
    MessageSent(MessageSent),
    Executed(DepositOrWithdrawalExecuted),
    WithdrawalStateUpdated(WithdrawalStateUpdated),
}

impl IndexerEvent {
    pub fn block_number(&self) -> i64 {
        match self {
            IndexerEvent::MessageSent(e) => e.block_number,
            IndexerEvent::Executed(e) => e.block_number,
            IndexerEvent::WithdrawalStateUpdated(e) => e.block_number,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            IndexerEvent::MessageSent(e) => &e.id,
            IndexerEvent::Executed(e) => &e.id,
            IndexerEvent::WithdrawalStateUpdated(e) => &e.id,
        }
    }
}
