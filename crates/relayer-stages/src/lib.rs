#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! The seven stage handlers (C4, §4.4): each advances `BridgeMessage` or
//! `VaultControllerBatch` state by exactly one step per poll. Handlers share
//! nothing but [`StageContext`] and never call one another directly — the
//! worker runtime (`relayer-worker`) is the only thing that sequences them,
//! implicitly, by running them concurrently against the same store.

mod bridge_finalize;
mod bridge_initiated;
mod contracts;
mod l1_batch_finalized;
mod l1_batch_number;
mod stale_pending_reconciler;
mod vault_controller_update;
mod withdrawal_state_updated;

pub use bridge_finalize::BridgeFinalize;
pub use bridge_initiated::BridgeInitiated;
pub use l1_batch_finalized::L1BatchFinalized;
pub use l1_batch_number::L1BatchNumber;
pub use stale_pending_reconciler::StalePendingReconciler;
pub use vault_controller_update::VaultControllerUpdate;
pub use withdrawal_state_updated::WithdrawalStateUpdated;

use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use relayer_chain::SignedSender;
use relayer_config::RelayerConfig;
use relayer_indexer::EventSource;
use relayer_store::TransactionStore;
use relayer_types::{Chain, StageError};

/// One step of work for a `(stage, origin)` pair (§4.4).
///
/// `handle` returns `Ok(true)` when it changed at least one row — the worker
/// runtime polls such a handler again immediately instead of sleeping.
/// Handlers never propagate a per-item error out of `handle`: an item's error
/// is logged and the loop continues, so `Err` here means the *entire* batch
/// could not even be fetched (e.g. the indexer or store itself is down).
#[async_trait]
pub trait StageHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn origin(&self) -> Chain;
    async fn handle(&self) -> Result<bool, StageError>;
}

/// Shared collaborators every stage handler is built from. Cheap to clone —
/// everything inside is already behind an `Arc`.
#[derive(Clone)]
pub struct StageContext {
    pub store: Arc<dyn TransactionStore>,
    pub indexer: Arc<dyn EventSource>,
    pub sender: Arc<dyn SignedSender>,
    pub config: Arc<RelayerConfig>,
}

impl StageContext {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        indexer: Arc<dyn EventSource>,
        sender: Arc<dyn SignedSender>,
        config: Arc<RelayerConfig>,
    ) -> Self {
        Self {
            store,
            indexer,
            sender,
            config,
        }
    }

    fn chain_config(&self, chain: Chain) -> &relayer_config::ChainConfig {
        match chain {
            Chain::Ethereum => &self.config.ethereum,
            Chain::Via => &self.config.via,
        }
    }

    fn bridge_address(&self, chain: Chain) -> Address {
        self.chain_config(chain).bridge_address
    }

    fn wait_confirmations(&self, chain: Chain) -> u64 {
        self.chain_config(chain).wait_block_confirmations
    }

    fn batch_size(&self) -> i64 {
        self.config.transaction_batch_size as i64
    }

    /// The highest block a stage reading `chain` is allowed to consider,
    /// given the chain's configured confirmation depth.
    async fn confirmed_head(&self, chain: Chain) -> Result<i64, StageError> {
        let head = self.sender.block_number(chain).await?;
        Ok(head.saturating_sub(self.wait_confirmations(chain)) as i64)
    }
}
