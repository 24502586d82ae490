//! `sqlx::FromRow` mirrors of the domain types, plus the fallible conversions
//! into `relayer_types` values. Kept separate from the domain crate so that
//! `relayer-types` stays free of any database driver dependency.

use std::str::FromStr;

use alloy_primitives::{Address, B256};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use relayer_types::{BatchStatus, BridgeMessage, Chain, MessageStatus, StoreError, VaultControllerBatch};

#[derive(sqlx::FromRow)]
pub(crate) struct MessageRow {
    pub id: i64,
    pub origin: String,
    pub status: String,
    pub source_tx_hash: Vec<u8>,
    pub dest_tx_hash: Option<Vec<u8>>,
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

impl TryFrom<MessageRow> for BridgeMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(BridgeMessage {
            id: row.id,
            origin: parse_chain(&row.origin)?,
            status: parse_status(&row.status)?,
            source_tx_hash: parse_hash(&row.source_tx_hash)?,
            dest_tx_hash: row.dest_tx_hash.as_deref().map(parse_hash).transpose()?,
            origin_block: row.origin_block,
            dest_block: row.dest_block,
            l1_batch_number: row.l1_batch_number,
            payload: row.payload,
            event_type: row.event_type,
            subgraph_id: row.subgraph_id,
            vault_ctrl_ref: row.vault_ctrl_ref,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BatchRow {
    pub id: i64,
    pub transaction_hash: Vec<u8>,
    pub l1_batch_number: i64,
    pub l1_vault_address: Vec<u8>,
    pub total_shares: BigDecimal,
    pub message_hash_count: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for VaultControllerBatch {
    type Error = StoreError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(VaultControllerBatch {
            id: row.id,
            transaction_hash: parse_hash(&row.transaction_hash)?,
            l1_batch_number: row.l1_batch_number,
            l1_vault_address: parse_address(&row.l1_vault_address)?,
            total_shares: row.total_shares,
            message_hash_count: row.message_hash_count,
            status: parse_batch_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_hash(bytes: &[u8]) -> Result<B256, StoreError> {
    <[u8; 32]>::try_from(bytes)
        .map(B256::from)
        .map_err(|_| StoreError::Io(format!("expected 32-byte hash, got {} bytes", bytes.len())))
}

fn parse_address(bytes: &[u8]) -> Result<Address, StoreError> {
    <[u8; 20]>::try_from(bytes)
        .map(Address::from)
        .map_err(|_| StoreError::Io(format!("expected 20-byte address, got {} bytes", bytes.len())))
}

fn parse_chain(s: &str) -> Result<Chain, StoreError> {
    Chain::from_str(s).map_err(StoreError::Io)
}

fn parse_status(s: &str) -> Result<MessageStatus, StoreError> {
    match s {
        "new" => Ok(MessageStatus::New),
        "pending" => Ok(MessageStatus::Pending),
        "finalized" => Ok(MessageStatus::Finalized),
        "vault_updated" => Ok(MessageStatus::VaultUpdated),
        "l1_batch_finalized" => Ok(MessageStatus::L1BatchFinalized),
        "failed" => Ok(MessageStatus::Failed),
        "refunded" => Ok(MessageStatus::Refunded),
        other => Err(StoreError::Io(format!("unknown message status: {other}"))),
    }
}

fn parse_batch_status(s: &str) -> Result<BatchStatus, StoreError> {
    match s {
        "pending" => Ok(BatchStatus::Pending),
        "confirmed" => Ok(BatchStatus::Confirmed),
        "failed" => Ok(BatchStatus::Failed),
        "ready_to_claim" => Ok(BatchStatus::ReadyToClaim),
        other => Err(StoreError::Io(format!("unknown batch status: {other}"))),
    }
}
