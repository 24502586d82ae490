#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! The event source (C1, §4.1): a read-only capability over indexer-observed
//! chain events, backed by either a direct relational mirror or a remote HTTP
//! query API. Stage handlers depend only on [`EventSource`].

pub mod http;
pub mod sql;

pub use http::HttpEventSource;
pub use sql::SqlEventSource;

use alloy_primitives::B256;
use async_trait::async_trait;
use relayer_types::{
    Chain, DepositOrWithdrawalExecuted, IndexerError, MessageSent, WithdrawalStateUpdated,
};

/// Identifies which event stream a query targets. `MessageSent`/`Executed` are
/// chain-scoped: each chain emits its own stream of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStream {
    MessageSent(Chain),
    Executed(Chain),
}

impl EventStream {
    pub fn label(self) -> &'static str {
        match self {
            EventStream::MessageSent(Chain::Ethereum) => "message_sent.ethereum",
            EventStream::MessageSent(Chain::Via) => "message_sent.via",
            EventStream::Executed(Chain::Ethereum) => "executed.ethereum",
            EventStream::Executed(Chain::Via) => "executed.via",
        }
    }
}

/// The read-only event capability consumed by `BridgeInitiated`, `BridgeFinalize`,
/// `VaultControllerUpdate`, and `WithdrawalStateUpdated` (§4.1).
///
/// Results are always ordered by `(blockNumber ASC, id ASC)`. `from_block` is
/// **inclusive** for `MessageSent` streams and **exclusive** for `Executed`
/// streams — callers pass a confirmation-adjusted `to_block` ceiling explicitly;
/// this trait never applies its own confirmation depth.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn message_sent_events(
        &self,
        stream: EventStream,
        from_block: i64,
        to_block: i64,
        limit: i64,
    ) -> Result<Vec<MessageSent>, IndexerError>;

    async fn executed_events(
        &self,
        stream: EventStream,
        from_block: i64,
        to_block: i64,
        limit: i64,
    ) -> Result<Vec<DepositOrWithdrawalExecuted>, IndexerError>;

    async fn executed_events_by_tx_hashes(
        &self,
        stream: EventStream,
        hashes: &[B256],
    ) -> Result<Vec<DepositOrWithdrawalExecuted>, IndexerError>;

    async fn withdrawal_state_events(
        &self,
        batch_numbers: &[i64],
        max_block: i64,
        limit: i64,
    ) -> Result<Vec<WithdrawalStateUpdated>, IndexerError>;
}
