#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! The transaction store (C2, §4.2): persistence for `BridgeMessage`,
//! `VaultControllerBatch`, and `EventCursor`, behind the [`TransactionStore`]
//! capability so stage handlers never depend on a concrete database driver.

mod pg;
mod rows;

pub use pg::PgTransactionStore;

use std::time::Duration;

use async_trait::async_trait;
use relayer_types::{
    BridgeMessage, Chain, MessageStatus, NewBridgeMessage, NewVaultControllerBatch, StoreError,
    VaultControllerBatch,
};

/// The persistence capability consumed by every stage handler (§4.2).
///
/// All multi-row mutations (`update_status_batch`, `link_to_batch`, the
/// `upsert_message` + link sequence inside `VaultControllerUpdate`) execute in a
/// single database transaction; implementors must preserve that atomicity.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn upsert_message(&self, fields: NewBridgeMessage) -> Result<BridgeMessage, StoreError>;
    async fn find_by_source_hash(
        &self,
        source_tx_hash: &[u8; 32],
    ) -> Result<Option<BridgeMessage>, StoreError>;
    async fn find_by_dest_hash(
        &self,
        dest_tx_hash: &[u8; 32],
    ) -> Result<Option<BridgeMessage>, StoreError>;
    async fn find_by_subgraph_id(
        &self,
        subgraph_id: &str,
    ) -> Result<Option<BridgeMessage>, StoreError>;

    async fn messages_by_status(
        &self,
        status: MessageStatus,
        origin: Chain,
        limit: i64,
        max_block: Option<i64>,
    ) -> Result<Vec<BridgeMessage>, StoreError>;

    async fn last_origin_block(&self, origin: Chain) -> Result<i64, StoreError>;
    async fn last_dest_block(&self, origin: Chain) -> Result<i64, StoreError>;

    async fn messages_missing_batch_number(
        &self,
        origin: Chain,
        limit: i64,
    ) -> Result<Vec<BridgeMessage>, StoreError>;
    async fn stamp_l1_batch_number(&self, id: i64, l1_batch_number: i64) -> Result<(), StoreError>;
    async fn messages_with_batch_number(
        &self,
        origin: Chain,
        limit: i64,
    ) -> Result<Vec<BridgeMessage>, StoreError>;

    async fn update_status_batch(
        &self,
        ids: &[i64],
        new_status: MessageStatus,
    ) -> Result<(), StoreError>;
    async fn link_to_batch(&self, ids: &[i64], batch_id: i64) -> Result<(), StoreError>;

    /// Links `ids` to `batch_id` and advances their status in one transaction
    /// (§4.4.4 step 5 — both writes must land together or not at all).
    async fn link_to_batch_and_advance(
        &self,
        ids: &[i64],
        batch_id: i64,
        new_status: MessageStatus,
    ) -> Result<(), StoreError>;

    /// Transitions a single `Pending` message to `Finalized`, stamping `destBlock`.
    /// Used by `BridgeFinalize` (observed completion) and `StalePendingReconciler`
    /// (observed completion discovered late, via receipt polling).
    async fn finalize_message(&self, id: i64, dest_block: i64) -> Result<(), StoreError>;

    async fn stale_pending(
        &self,
        origin: Chain,
        older_than: Duration,
        limit: i64,
    ) -> Result<Vec<BridgeMessage>, StoreError>;

    async fn upsert_cursor(&self, stream: &str, ordinal: i64) -> Result<(), StoreError>;
    async fn cursor(&self, stream: &str) -> Result<i64, StoreError>;

    async fn create_batch(
        &self,
        fields: NewVaultControllerBatch,
    ) -> Result<VaultControllerBatch, StoreError>;
    async fn batch_by_id(&self, id: i64) -> Result<Option<VaultControllerBatch>, StoreError>;
    /// Batches are always Via-origin in practice (only `VaultControllerUpdate`
    /// creates them); `origin` is accepted for interface symmetry with the
    /// message queries and ignored by the Postgres implementation.
    async fn pending_batches(
        &self,
        origin: Chain,
        limit: i64,
    ) -> Result<Vec<VaultControllerBatch>, StoreError>;
    async fn update_batch_status(
        &self,
        id: i64,
        status: relayer_types::BatchStatus,
    ) -> Result<(), StoreError>;
    async fn stale_pending_batches(
        &self,
        older_than: Duration,
        limit: i64,
    ) -> Result<Vec<VaultControllerBatch>, StoreError>;
}
