//! Typed error enums at each component boundary (§7, §4.9).
//!
//! `ConfigError` is fatal — it can only occur at boot, before any worker is spawned.
//! `StoreError`, `IndexerError`, and `RpcError` are transient: a stage handler logs
//! and retries on the next poll rather than propagating them further. `StageError`
//! is the per-item outcome a stage handler produces; `BroadcastReverted` routes a
//! message to `Failed`, `Unexpected` is logged and the item is skipped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("{field} must be >= {min}, got {actual}")]
    BelowMinimum {
        field: &'static str,
        min: u64,
        actual: u64,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store not connected")]
    NotConnected,
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("store io error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("indexer transport error: {0}")]
    Transport(String),
    #[error("indexer returned a malformed response: {0}")]
    Malformed(String),
    #[error("indexer request exhausted its retry budget: {0}")]
    RetriesExhausted(String),
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc transport error on {chain}: {source}")]
    Transport { chain: &'static str, source: String },
    #[error("rpc call to {chain} timed out after {millis}ms")]
    Timeout { chain: &'static str, millis: u64 },
    #[error("rpc call to {chain} returned a malformed response: {0}")]
    Malformed(String, &'static str),
}

/// The per-item outcome of a stage handler (§4.4.8, §7).
#[derive(Debug, Error)]
pub enum StageError {
    #[error("broadcast transaction reverted: {tx_hash}")]
    BroadcastReverted { tx_hash: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Indexer(#[from] IndexerError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl StageError {
    /// Coarse label used for metric cardinality and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::BroadcastReverted { .. } => "broadcast_reverted",
            StageError::Store(_) => "store",
            StageError::Indexer(_) => "indexer",
            StageError::Rpc(_) => "rpc",
            StageError::Unexpected(_) => "unexpected",
        }
    }
}
