#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

//! Shared domain types for the Via bridge relayer.
//!
//! This crate has no I/O of its own: it defines the entities of §3 (`BridgeMessage`,
//! `VaultControllerBatch`, `EventCursor`), the indexer event shapes consumed by the
//! stage handlers, the message-hash computation used by `VaultControllerUpdate`, and
//! the typed error enums shared across crate boundaries.

pub mod chain;
pub mod error;
pub mod event;
pub mod hash;
pub mod message;
pub mod status;

pub use chain::Chain;
pub use error::{ConfigError, IndexerError, RpcError, StageError, StoreError};
pub use event::{DepositOrWithdrawalExecuted, IndexerEvent, MessageSent, WithdrawalStateUpdated};
pub use hash::message_hash;
pub use message::{BridgeMessage, NewBridgeMessage, NewVaultControllerBatch, VaultControllerBatch};
pub use status::{BatchStatus, MessageStatus};
