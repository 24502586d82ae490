use std::time::Duration;

use async_trait::async_trait;
use relayer_telemetry::metrics;
use relayer_types::{
    BatchStatus, BridgeMessage, Chain, MessageStatus, NewBridgeMessage, NewVaultControllerBatch,
    StoreError, VaultControllerBatch,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::rows::{BatchRow, MessageRow};
use crate::TransactionStore;

/// Postgres-backed implementation of [`TransactionStore`], pooled via `sqlx`.
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    /// Connects, applies pending migrations (idempotent — a restart against an
    /// already-migrated database is a no-op), and returns a ready store.
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        metrics().set_pool_size(pool_size as f64);
        Ok(Self { pool })
    }

    async fn time<T>(
        &self,
        op: &'static str,
        fut: impl std::future::Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, StoreError> {
        let start = std::time::Instant::now();
        let result = fut.await;
        metrics().observe_query_duration(op, start.elapsed().as_secs_f64());
        result.map_err(map_sqlx_err)
    }
}

fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::NotConnected,
        other => StoreError::Io(other.to_string()),
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn upsert_message(&self, fields: NewBridgeMessage) -> Result<BridgeMessage, StoreError> {
        let row: MessageRow = self
            .time(
                "upsert_message",
                sqlx::query_as(
                    r#"
                    INSERT INTO bridge_messages
                        (origin, status, source_tx_hash, dest_tx_hash, origin_block,
                         dest_block, payload, event_type, subgraph_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (source_tx_hash) DO UPDATE SET updated_at = now()
                    RETURNING id, origin, status, source_tx_hash, dest_tx_hash, origin_block,
                              dest_block, l1_batch_number, payload, event_type, subgraph_id,
                              vault_ctrl_ref, created_at, updated_at
                    "#,
                )
                .bind(fields.origin.as_str())
                .bind(fields.status.as_str())
                .bind(fields.source_tx_hash.as_slice())
                .bind(fields.dest_tx_hash.as_ref().map(|h| h.as_slice()))
                .bind(fields.origin_block)
                .bind(fields.dest_block)
                .bind(fields.payload)
                .bind(fields.event_type)
                .bind(fields.subgraph_id)
                .fetch_one(&self.pool),
            )
            .await?;
        row.try_into()
    }

    async fn find_by_source_hash(
        &self,
        source_tx_hash: &[u8; 32],
    ) -> Result<Option<BridgeMessage>, StoreError> {
        let row: Option<MessageRow> = self
            .time(
                "find_by_source_hash",
                sqlx::query_as("SELECT * FROM bridge_messages WHERE source_tx_hash = $1")
                    .bind(source_tx_hash.as_slice())
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_dest_hash(
        &self,
        dest_tx_hash: &[u8; 32],
    ) -> Result<Option<BridgeMessage>, StoreError> {
        let row: Option<MessageRow> = self
            .time(
                "find_by_dest_hash",
                sqlx::query_as("SELECT * FROM bridge_messages WHERE dest_tx_hash = $1")
                    .bind(dest_tx_hash.as_slice())
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_subgraph_id(
        &self,
        subgraph_id: &str,
    ) -> Result<Option<BridgeMessage>, StoreError> {
        let row: Option<MessageRow> = self
            .time(
                "find_by_subgraph_id",
                sqlx::query_as("SELECT * FROM bridge_messages WHERE subgraph_id = $1")
                    .bind(subgraph_id)
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn messages_by_status(
        &self,
        status: MessageStatus,
        origin: Chain,
        limit: i64,
        max_block: Option<i64>,
    ) -> Result<Vec<BridgeMessage>, StoreError> {
        let rows: Vec<MessageRow> = self
            .time(
                "messages_by_status",
                sqlx::query_as(
                    r#"
                    SELECT * FROM bridge_messages
                    WHERE status = $1 AND origin = $2
                      AND ($3::bigint IS NULL OR origin_block <= $3)
                    ORDER BY created_at ASC
                    LIMIT $4
                    "#,
                )
                .bind(status.as_str())
                .bind(origin.as_str())
                .bind(max_block)
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn last_origin_block(&self, origin: Chain) -> Result<i64, StoreError> {
        let max: Option<i64> = self
            .time(
                "last_origin_block",
                sqlx::query_scalar("SELECT max(origin_block) FROM bridge_messages WHERE origin = $1")
                    .bind(origin.as_str())
                    .fetch_one(&self.pool),
            )
            .await?;
        Ok(max.unwrap_or(0))
    }

    async fn last_dest_block(&self, origin: Chain) -> Result<i64, StoreError> {
        let max: Option<i64> = self
            .time(
                "last_dest_block",
                sqlx::query_scalar(
                    "SELECT max(dest_block) FROM bridge_messages WHERE origin = $1 AND status = 'finalized'",
                )
                .bind(origin.as_str())
                .fetch_one(&self.pool),
            )
            .await?;
        Ok(max.unwrap_or(0))
    }

    async fn messages_missing_batch_number(
        &self,
        origin: Chain,
        limit: i64,
    ) -> Result<Vec<BridgeMessage>, StoreError> {
        let rows: Vec<MessageRow> = self
            .time(
                "messages_missing_batch_number",
                sqlx::query_as(
                    r#"
                    SELECT * FROM bridge_messages
                    WHERE origin = $1 AND status = 'finalized' AND l1_batch_number IS NULL
                    ORDER BY created_at ASC
                    LIMIT $2
                    "#,
                )
                .bind(origin.as_str())
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn stamp_l1_batch_number(&self, id: i64, l1_batch_number: i64) -> Result<(), StoreError> {
        self.time(
            "stamp_l1_batch_number",
            sqlx::query(
                "UPDATE bridge_messages SET l1_batch_number = $2, updated_at = now() WHERE id = $1",
            )
            .bind(id)
            .bind(l1_batch_number)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn messages_with_batch_number(
        &self,
        origin: Chain,
        limit: i64,
    ) -> Result<Vec<BridgeMessage>, StoreError> {
        let rows: Vec<MessageRow> = self
            .time(
                "messages_with_batch_number",
                sqlx::query_as(
                    r#"
                    SELECT * FROM bridge_messages
                    WHERE origin = $1 AND status = 'finalized' AND l1_batch_number IS NOT NULL
                    ORDER BY l1_batch_number ASC
                    LIMIT $2
                    "#,
                )
                .bind(origin.as_str())
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_status_batch(
        &self,
        ids: &[i64],
        new_status: MessageStatus,
    ) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        sqlx::query("UPDATE bridge_messages SET status = $1, updated_at = now() WHERE id = ANY($2)")
            .bind(new_status.as_str())
            .bind(ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn finalize_message(&self, id: i64, dest_block: i64) -> Result<(), StoreError> {
        self.time(
            "finalize_message",
            sqlx::query(
                r#"
                UPDATE bridge_messages
                SET status = 'finalized', dest_block = $2, updated_at = now()
                WHERE id = $1 AND status = 'pending'
                "#,
            )
            .bind(id)
            .bind(dest_block)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn link_to_batch(&self, ids: &[i64], batch_id: i64) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        sqlx::query("UPDATE bridge_messages SET vault_ctrl_ref = $1, updated_at = now() WHERE id = ANY($2)")
            .bind(batch_id)
            .bind(ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn link_to_batch_and_advance(
        &self,
        ids: &[i64],
        batch_id: i64,
        new_status: MessageStatus,
    ) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        sqlx::query("UPDATE bridge_messages SET vault_ctrl_ref = $1, updated_at = now() WHERE id = ANY($2)")
            .bind(batch_id)
            .bind(ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        sqlx::query("UPDATE bridge_messages SET status = $1, updated_at = now() WHERE id = ANY($2)")
            .bind(new_status.as_str())
            .bind(ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        tx.commit().await.map_err(map_sqlx_err)
    }

    async fn stale_pending(
        &self,
        origin: Chain,
        older_than: Duration,
        limit: i64,
    ) -> Result<Vec<BridgeMessage>, StoreError> {
        let threshold_secs = older_than.as_secs() as f64;
        let rows: Vec<MessageRow> = self
            .time(
                "stale_pending",
                sqlx::query_as(
                    r#"
                    SELECT * FROM bridge_messages
                    WHERE origin = $1 AND status = 'pending'
                      AND created_at < now() - make_interval(secs => $2)
                    ORDER BY created_at ASC
                    LIMIT $3
                    "#,
                )
                .bind(origin.as_str())
                .bind(threshold_secs)
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_cursor(&self, stream: &str, ordinal: i64) -> Result<(), StoreError> {
        self.time(
            "upsert_cursor",
            sqlx::query(
                r#"
                INSERT INTO event_cursors (stream_name, last_processed)
                VALUES ($1, $2)
                ON CONFLICT (stream_name) DO UPDATE
                    SET last_processed = GREATEST(event_cursors.last_processed, EXCLUDED.last_processed)
                "#,
            )
            .bind(stream)
            .bind(ordinal)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn cursor(&self, stream: &str) -> Result<i64, StoreError> {
        let value: Option<i64> = self
            .time(
                "cursor",
                sqlx::query_scalar("SELECT last_processed FROM event_cursors WHERE stream_name = $1")
                    .bind(stream)
                    .fetch_optional(&self.pool),
            )
            .await?;
        Ok(value.unwrap_or(0))
    }

    async fn create_batch(
        &self,
        fields: NewVaultControllerBatch,
    ) -> Result<VaultControllerBatch, StoreError> {
        let row: BatchRow = self
            .time(
                "create_batch",
                sqlx::query_as(
                    r#"
                    INSERT INTO vault_controller_batches
                        (transaction_hash, l1_batch_number, l1_vault_address, total_shares,
                         message_hash_count, status)
                    VALUES ($1, $2, $3, $4, $5, 'pending')
                    RETURNING id, transaction_hash, l1_batch_number, l1_vault_address,
                              total_shares, message_hash_count, status, created_at, updated_at
                    "#,
                )
                .bind(fields.transaction_hash.as_slice())
                .bind(fields.l1_batch_number)
                .bind(fields.l1_vault_address.as_slice())
                .bind(fields.total_shares)
                .bind(fields.message_hash_count)
                .fetch_one(&self.pool),
            )
            .await?;
        row.try_into()
    }

    async fn batch_by_id(&self, id: i64) -> Result<Option<VaultControllerBatch>, StoreError> {
        let row: Option<BatchRow> = self
            .time(
                "batch_by_id",
                sqlx::query_as("SELECT * FROM vault_controller_batches WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn pending_batches(
        &self,
        _origin: Chain,
        limit: i64,
    ) -> Result<Vec<VaultControllerBatch>, StoreError> {
        let rows: Vec<BatchRow> = self
            .time(
                "pending_batches",
                sqlx::query_as(
                    "SELECT * FROM vault_controller_batches WHERE status = 'pending' ORDER BY created_at ASC LIMIT $1",
                )
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_batch_status(&self, id: i64, status: BatchStatus) -> Result<(), StoreError> {
        self.time(
            "update_batch_status",
            sqlx::query("UPDATE vault_controller_batches SET status = $1, updated_at = now() WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn stale_pending_batches(
        &self,
        older_than: Duration,
        limit: i64,
    ) -> Result<Vec<VaultControllerBatch>, StoreError> {
        let threshold_secs = older_than.as_secs() as f64;
        let rows: Vec<BatchRow> = self
            .time(
                "stale_pending_batches",
                sqlx::query_as(
                    r#"
                    SELECT * FROM vault_controller_batches
                    WHERE status = 'pending' AND created_at < now() - make_interval(secs => $1)
                    ORDER BY created_at ASC
                    LIMIT $2
                    "#,
                )
                .bind(threshold_secs)
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
