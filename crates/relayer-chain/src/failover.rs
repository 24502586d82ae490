//! A minimal RPC failover wrapper: a primary URL plus a list of fallback URLs,
//! tried in order on transport-level errors. Application-level errors (reverts,
//! malformed responses) are never retried against a different URL — they are
//! not a sign the endpoint itself is unhealthy.
//!
//! This is deliberately thin: the relayer's correctness does not depend on any
//! particular load-balancing policy, only on "some reachable endpoint was used".

use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::TransportError;
use alloy_primitives::{Address, Bytes, B256, U256};
use relayer_types::RpcError;
use serde_json::Value as JsonValue;

pub struct FailoverProvider {
    chain_label: &'static str,
    providers: Vec<RootProvider>,
    request_timeout: Duration,
}

impl FailoverProvider {
    pub fn new(
        chain_label: &'static str,
        primary_url: &str,
        fallback_urls: &[String],
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut providers = Vec::with_capacity(1 + fallback_urls.len());
        providers.push(ProviderBuilder::new().on_http(primary_url.parse()?));
        for url in fallback_urls {
            providers.push(ProviderBuilder::new().on_http(url.parse()?));
        }
        Ok(Self {
            chain_label,
            providers,
            request_timeout,
        })
    }

    /// Tries each provider in order, bounding every attempt by `request_timeout`
    /// (§5: "every RPC is bounded by `requestTimeout`"). Failover to the next URL
    /// only happens on a transport-level failure or a timeout — a JSON-RPC error
    /// response (`TransportError::ErrorResp`, e.g. a revert or a rejected nonce)
    /// means the endpoint is healthy and answered correctly, so it is returned
    /// immediately rather than retried elsewhere.
    async fn try_each<T, F, Fut>(&self, op: F) -> Result<T, RpcError>
    where
        F: Fn(&RootProvider) -> Fut,
        Fut: std::future::Future<Output = Result<T, TransportError>>,
    {
        let mut last_err: Option<String> = None;
        let mut timed_out = false;
        for provider in &self.providers {
            match tokio::time::timeout(self.request_timeout, op(provider)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(TransportError::ErrorResp(e))) => {
                    return Err(RpcError::Transport {
                        chain: self.chain_label,
                        source: e.to_string(),
                    });
                }
                Ok(Err(e)) => {
                    timed_out = false;
                    last_err = Some(e.to_string());
                }
                Err(_elapsed) => {
                    timed_out = true;
                    last_err = Some(format!("no response within {:?}", self.request_timeout));
                }
            }
        }

        if timed_out {
            return Err(RpcError::Timeout {
                chain: self.chain_label,
                millis: self.request_timeout.as_millis() as u64,
            });
        }
        Err(RpcError::Transport {
            chain: self.chain_label,
            source: last_err.unwrap_or_else(|| "no providers configured".into()),
        })
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        self.try_each(|p| p.get_block_number()).await
    }

    pub async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        self.try_each(|p| p.get_transaction_count(address)).await
    }

    pub async fn gas_price(&self) -> Result<u128, RpcError> {
        self.try_each(|p| p.get_gas_price()).await
    }

    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError> {
        self.try_each(|p| async move {
            let pending = p.send_raw_transaction(raw).await?;
            Ok(*pending.tx_hash())
        })
        .await
    }

    pub async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<alloy::rpc::types::TransactionReceipt>, RpcError> {
        self.try_each(|p| p.get_transaction_receipt(hash)).await
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        self.try_each(|p| p.get_chain_id()).await
    }

    pub async fn raw_request(&self, method: &str, params: JsonValue) -> Result<JsonValue, RpcError> {
        let method_owned = method.to_string();
        self.try_each(|p| {
            let method = method_owned.clone();
            let params = params.clone();
            async move {
                p.client()
                    .request(method, params)
                    .await
                    .map_err(alloy::transports::TransportError::from)
            }
        })
        .await
    }
}

/// Placeholder gas-hint conversion helper kept near the provider since both are
/// only meaningful together when building a Via transaction request.
pub fn decimal_to_u256(value: &bigdecimal::BigDecimal) -> Result<U256, RpcError> {
    U256::from_str_radix(&value.with_scale(0).to_string(), 10)
        .map_err(|e| RpcError::Malformed(e.to_string(), "l2_gas_hint"))
}
