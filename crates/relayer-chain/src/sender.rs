use std::str::FromStr;

use alloy::consensus::TxEnvelope;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use relayer_config::RelayerConfig;
use relayer_telemetry::metrics;
use relayer_types::{Chain, RpcError};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::failover::{decimal_to_u256, FailoverProvider};
use crate::{GasHints, Receipt, ReceiptStatus, SignedSender};

struct ChainHandle {
    provider: FailoverProvider,
    wallet: EthereumWallet,
    address: Address,
    chain_id: u64,
    /// Guards nonce read-and-increment across the sign+submit window (§5
    /// Mutual exclusion): held from nonce lookup through broadcast, released
    /// before waiting on inclusion.
    nonce_lock: Mutex<()>,
    gas_hints: Option<GasHints>,
}

/// `alloy`-backed implementation of [`SignedSender`] with one signing identity
/// per chain.
pub struct AlloySignedSender {
    ethereum: ChainHandle,
    via: ChainHandle,
}

impl AlloySignedSender {
    pub async fn new(config: &RelayerConfig) -> anyhow::Result<Self> {
        let signer = PrivateKeySigner::from_str(&config.relayer_private_key)?;
        let wallet = EthereumWallet::from(signer.clone());
        let address = signer.address();

        let eth_provider = FailoverProvider::new(
            "ethereum",
            &config.ethereum.rpc_url,
            &config.ethereum.fallback_rpc_urls,
            config.rpc_request_timeout,
        )?;
        let eth_chain_id = eth_provider.chain_id().await?;

        let via_provider = FailoverProvider::new(
            "via",
            &config.via.rpc_url,
            &config.via.fallback_rpc_urls,
            config.rpc_request_timeout,
        )?;
        let via_chain_id = via_provider.chain_id().await?;

        let gas_hints = GasHints {
            gas_price: decimal_to_u256(&config.l2_gas_hints.gas_price)?,
            gas_limit: decimal_to_u256(&config.l2_gas_hints.gas_limit)?,
            gas_per_pubdata: decimal_to_u256(&config.l2_gas_hints.gas_per_pubdata)?,
        };

        Ok(Self {
            ethereum: ChainHandle {
                provider: eth_provider,
                wallet: wallet.clone(),
                address,
                chain_id: eth_chain_id,
                nonce_lock: Mutex::new(()),
                gas_hints: None,
            },
            via: ChainHandle {
                provider: via_provider,
                wallet,
                address,
                chain_id: via_chain_id,
                nonce_lock: Mutex::new(()),
                gas_hints: Some(gas_hints),
            },
        })
    }

    fn handle(&self, chain: Chain) -> &ChainHandle {
        match chain {
            Chain::Ethereum => &self.ethereum,
            Chain::Via => &self.via,
        }
    }

    async fn sign_and_broadcast(
        &self,
        chain: Chain,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<B256, RpcError> {
        let handle = self.handle(chain);
        let start = std::time::Instant::now();

        // Hold the nonce lock from read through broadcast: two concurrent
        // callers on the same chain must never observe the same nonce.
        let _guard = handle.nonce_lock.lock().await;
        let nonce = handle.provider.transaction_count(handle.address).await?;

        let mut request = TransactionRequest::default()
            .with_to(to)
            .with_value(value)
            .with_input(data)
            .with_nonce(nonce)
            .with_chain_id(handle.chain_id);

        request = match &handle.gas_hints {
            Some(hints) => request
                .with_gas_limit(hints.gas_limit.to::<u64>())
                .with_gas_price(hints.gas_price.to::<u128>()),
            None => {
                let gas_price = handle.provider.gas_price().await?;
                request.with_gas_price(gas_price).with_gas_limit(300_000)
            }
        };

        let envelope: TxEnvelope = request
            .build(&handle.wallet)
            .await
            .map_err(|e| RpcError::Malformed(e.to_string(), "transaction_build"))?;
        let raw: Bytes = envelope.encoded_2718().into();

        let hash = handle.provider.send_raw_transaction(&raw).await;
        metrics().observe_broadcast_latency(chain.as_str(), start.elapsed().as_secs_f64());
        match &hash {
            Ok(_) => metrics().inc_broadcast_submitted(chain.as_str()),
            Err(_) => metrics().inc_error("rpc", "broadcast_failed"),
        }
        hash
    }
}

#[async_trait]
impl SignedSender for AlloySignedSender {
    async fn send_raw(
        &self,
        chain: Chain,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> Result<B256, RpcError> {
        self.sign_and_broadcast(chain, to, data, value).await
    }

    async fn send_contract_call(
        &self,
        chain: Chain,
        contract: Address,
        calldata: Bytes,
    ) -> Result<B256, RpcError> {
        self.sign_and_broadcast(chain, contract, calldata, U256::ZERO).await
    }

    async fn receipt(&self, chain: Chain, hash: B256) -> Result<Option<Receipt>, RpcError> {
        let handle = self.handle(chain);
        let receipt = handle.provider.transaction_receipt(hash).await?;
        Ok(receipt.map(|r| Receipt {
            status: if r.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            },
            block_number: r.block_number.unwrap_or(0),
        }))
    }

    async fn block_number(&self, chain: Chain) -> Result<u64, RpcError> {
        self.handle(chain).provider.block_number().await
    }

    async fn raw_rpc(
        &self,
        chain: Chain,
        method: &str,
        params: JsonValue,
    ) -> Result<JsonValue, RpcError> {
        self.handle(chain).provider.raw_request(method, params).await
    }
}
