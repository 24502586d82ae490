//! Direct relational backend: parameterized SQL against a read-only mirror of
//! the indexer's own tables (§4.1).

use alloy_primitives::B256;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use relayer_telemetry::metrics;
use relayer_types::{
    Chain, DepositOrWithdrawalExecuted, IndexerError, MessageSent, WithdrawalStateUpdated,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::{EventSource, EventStream};

pub struct SqlEventSource {
    pool: PgPool,
}

impl SqlEventSource {
    pub async fn connect(database_url: &str) -> Result<Self, IndexerError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| IndexerError::Transport(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn timed<T>(
        &self,
        stream: EventStream,
        fut: impl std::future::Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, IndexerError> {
        let start = std::time::Instant::now();
        let result = fut.await;
        metrics().observe_query_duration(stream.label(), start.elapsed().as_secs_f64());
        result.map_err(|e| IndexerError::Transport(e.to_string()))
    }
}

#[derive(sqlx::FromRow)]
struct MessageSentRow {
    id: String,
    block_number: i64,
    transaction_hash: Vec<u8>,
    block_timestamp: DateTime<Utc>,
    payload: Vec<u8>,
}

impl TryFrom<MessageSentRow> for MessageSent {
    type Error = IndexerError;
    fn try_from(row: MessageSentRow) -> Result<Self, Self::Error> {
        Ok(MessageSent {
            id: row.id,
            block_number: row.block_number,
            transaction_hash: parse_hash(&row.transaction_hash)?,
            block_timestamp: row.block_timestamp,
            payload: row.payload,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExecutedRow {
    id: String,
    block_number: i64,
    transaction_hash: Vec<u8>,
    vault_nonce: BigDecimal,
    vault: Vec<u8>,
    receiver: Vec<u8>,
    shares: BigDecimal,
}

impl TryFrom<ExecutedRow> for DepositOrWithdrawalExecuted {
    type Error = IndexerError;
    fn try_from(row: ExecutedRow) -> Result<Self, Self::Error> {
        use alloy_primitives::{Address, U256};
        use std::str::FromStr;
        Ok(DepositOrWithdrawalExecuted {
            id: row.id,
            block_number: row.block_number,
            transaction_hash: parse_hash(&row.transaction_hash)?,
            vault_nonce: U256::from_str(&row.vault_nonce.to_string())
                .map_err(|e| IndexerError::Malformed(e.to_string()))?,
            vault: parse_address(&row.vault)?,
            receiver: parse_address(&row.receiver)?,
            shares: row.shares,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WithdrawalStateUpdatedRow {
    id: String,
    block_number: i64,
    transaction_hash: Vec<u8>,
    l1_batch: i64,
    exchange_rate: BigDecimal,
    message_count: i64,
}

impl TryFrom<WithdrawalStateUpdatedRow> for WithdrawalStateUpdated {
    type Error = IndexerError;
    fn try_from(row: WithdrawalStateUpdatedRow) -> Result<Self, Self::Error> {
        Ok(WithdrawalStateUpdated {
            id: row.id,
            block_number: row.block_number,
            transaction_hash: parse_hash(&row.transaction_hash)?,
            l1_batch: row.l1_batch,
            exchange_rate: row.exchange_rate,
            message_count: row.message_count,
        })
    }
}

fn parse_hash(bytes: &[u8]) -> Result<B256, IndexerError> {
    <[u8; 32]>::try_from(bytes)
        .map(B256::from)
        .map_err(|_| IndexerError::Malformed(format!("expected 32-byte hash, got {} bytes", bytes.len())))
}

fn parse_address(bytes: &[u8]) -> Result<alloy_primitives::Address, IndexerError> {
    <[u8; 20]>::try_from(bytes)
        .map(alloy_primitives::Address::from)
        .map_err(|_| IndexerError::Malformed(format!("expected 20-byte address, got {} bytes", bytes.len())))
}

fn table_for(stream: EventStream) -> (&'static str, Chain) {
    match stream {
        EventStream::MessageSent(chain) => ("message_sent_events", chain),
        EventStream::Executed(chain) => ("executed_events", chain),
    }
}

#[async_trait]
impl EventSource for SqlEventSource {
    async fn message_sent_events(
        &self,
        stream: EventStream,
        from_block: i64,
        to_block: i64,
        limit: i64,
    ) -> Result<Vec<MessageSent>, IndexerError> {
        let (table, chain) = table_for(stream);
        let query = format!(
            "SELECT id, block_number, transaction_hash, block_timestamp, payload FROM {table} \
             WHERE chain = $1 AND block_number >= $2 AND block_number <= $3 \
             ORDER BY block_number ASC, id ASC LIMIT $4"
        );
        let rows: Vec<MessageSentRow> = self
            .timed(
                stream,
                sqlx::query_as(&query)
                    .bind(chain.as_str())
                    .bind(from_block)
                    .bind(to_block)
                    .bind(limit)
                    .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn executed_events(
        &self,
        stream: EventStream,
        from_block: i64,
        to_block: i64,
        limit: i64,
    ) -> Result<Vec<DepositOrWithdrawalExecuted>, IndexerError> {
        let (table, chain) = table_for(stream);
        let query = format!(
            "SELECT id, block_number, transaction_hash, vault_nonce, vault, receiver, shares \
             FROM {table} WHERE chain = $1 AND block_number > $2 AND block_number <= $3 \
             ORDER BY block_number ASC, id ASC LIMIT $4"
        );
        let rows: Vec<ExecutedRow> = self
            .timed(
                stream,
                sqlx::query_as(&query)
                    .bind(chain.as_str())
                    .bind(from_block)
                    .bind(to_block)
                    .bind(limit)
                    .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn executed_events_by_tx_hashes(
        &self,
        stream: EventStream,
        hashes: &[B256],
    ) -> Result<Vec<DepositOrWithdrawalExecuted>, IndexerError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let (table, chain) = table_for(stream);
        let hash_bytes: Vec<&[u8]> = hashes.iter().map(|h| h.as_slice()).collect();
        let query = format!(
            "SELECT id, block_number, transaction_hash, vault_nonce, vault, receiver, shares \
             FROM {table} WHERE chain = $1 AND transaction_hash = ANY($2) \
             ORDER BY block_number ASC, id ASC"
        );
        let rows: Vec<ExecutedRow> = self
            .timed(
                stream,
                sqlx::query_as(&query)
                    .bind(chain.as_str())
                    .bind(&hash_bytes[..])
                    .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn withdrawal_state_events(
        &self,
        batch_numbers: &[i64],
        max_block: i64,
        limit: i64,
    ) -> Result<Vec<WithdrawalStateUpdated>, IndexerError> {
        if batch_numbers.is_empty() {
            return Ok(Vec::new());
        }
        let stream = EventStream::Executed(Chain::Via);
        let rows: Vec<WithdrawalStateUpdatedRow> = self
            .timed(
                stream,
                sqlx::query_as(
                    "SELECT id, block_number, transaction_hash, l1_batch, exchange_rate, message_count \
                     FROM withdrawal_state_updated_events \
                     WHERE l1_batch = ANY($1) AND block_number <= $2 \
                     ORDER BY block_number ASC, id ASC LIMIT $3",
                )
                .bind(batch_numbers)
                .bind(max_block)
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
