#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! The signed-sender (C3, §4.3): one signing identity per chain, with serialized
//! nonce acquisition so concurrent callers within the process never collide.

mod failover;
mod sender;

pub use failover::{decimal_to_u256, FailoverProvider};
pub use sender::AlloySignedSender;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use relayer_types::{Chain, RpcError};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone)]
pub struct Receipt {
    pub status: ReceiptStatus,
    pub block_number: u64,
}

/// Gas hints applied to Via-bound broadcasts (§6 `L2_GAS_PRICE`/`L2_GAS_LIMIT`/`L2_GAS_PER_PUBDATA`).
#[derive(Debug, Clone, Copy)]
pub struct GasHints {
    pub gas_price: U256,
    pub gas_limit: U256,
    pub gas_per_pubdata: U256,
}

/// The broadcast capability consumed by every stage handler that moves a
/// message forward (§4.3). Implementors must serialize nonce read-and-increment
/// per chain: see `AlloySignedSender`'s per-chain `tokio::sync::Mutex`.
#[async_trait]
pub trait SignedSender: Send + Sync {
    async fn send_raw(
        &self,
        chain: Chain,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<B256, RpcError>;

    async fn send_contract_call(
        &self,
        chain: Chain,
        contract: Address,
        calldata: Bytes,
    ) -> Result<B256, RpcError>;

    async fn receipt(&self, chain: Chain, hash: B256) -> Result<Option<Receipt>, RpcError>;

    async fn block_number(&self, chain: Chain) -> Result<u64, RpcError>;

    async fn raw_rpc(
        &self,
        chain: Chain,
        method: &str,
        params: JsonValue,
    ) -> Result<JsonValue, RpcError>;
}
