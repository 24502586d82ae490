//! Remote HTTP backend: a handful of fixed query-document shapes posted to a
//! indexer query endpoint, with retry + exponential back-off + timeout. The
//! relayer only ever issues four distinct query shapes, so this is a small typed
//! client rather than a general GraphQL library.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use reqwest::{
    header::{HeaderValue, RETRY_AFTER},
    Client, StatusCode,
};
use relayer_telemetry::metrics;
use relayer_types::{
    Chain, DepositOrWithdrawalExecuted, IndexerError, MessageSent, WithdrawalStateUpdated,
};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::{EventSource, EventStream};

const BASE_BACKOFF_MS: u64 = 50;

fn retry_delay(attempt: usize, retry_after: Option<&HeaderValue>) -> Duration {
    if let Some(secs) = retry_after
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
    {
        return Duration::from_secs(secs.min(5));
    }
    let ms = BASE_BACKOFF_MS.saturating_mul(1u64 << attempt).min(800);
    Duration::from_millis(ms)
}

fn ascii_snippet(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    let s = s.trim();
    let s = if s.len() > 160 { &s[..160] } else { s };
    s.replace('\n', "\\n").replace('\r', "\\r").replace('\t', "\\t")
}

pub struct HttpEventSource {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    request_timeout: Duration,
    max_retries: usize,
}

impl HttpEventSource {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        request_timeout: Duration,
        max_retries: usize,
    ) -> Self {
        Self {
            base_url,
            api_key,
            client: Client::new(),
            request_timeout,
            max_retries,
        }
    }

    async fn post_with_retry<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        stream_label: &'static str,
        body: &Req,
    ) -> Result<Resp, IndexerError> {
        let start = std::time::Instant::now();
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0usize;
        let (status, bytes) = loop {
            let mut req = self.client.post(&url).timeout(self.request_timeout).json(body);
            if let Some(key) = &self.api_key {
                req = req.bearer_auth(key);
            }
            let resp = req.send().await;
            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    if attempt < self.max_retries {
                        tracing::debug!(target = "indexer", attempt, error = %e, "transport error, retrying");
                        metrics().inc_retries(stream_label);
                        sleep(retry_delay(attempt, None)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(IndexerError::RetriesExhausted(e.to_string()));
                }
            };
            let status = resp.status();
            let headers = resp.headers().clone();
            let body_bytes = resp.bytes().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                if attempt < self.max_retries {
                    let delay = retry_delay(attempt, headers.get(RETRY_AFTER));
                    tracing::debug!(
                        target = "indexer",
                        status = status.as_u16(),
                        body = %ascii_snippet(&body_bytes),
                        "retryable status, backing off {:?}",
                        delay
                    );
                    metrics().inc_retries(stream_label);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return Err(IndexerError::RetriesExhausted(format!(
                    "HTTP {} after {} retries: {}",
                    status.as_u16(),
                    self.max_retries,
                    ascii_snippet(&body_bytes)
                )));
            }
            break (status, body_bytes);
        };
        metrics().observe_query_duration(stream_label, start.elapsed().as_secs_f64());

        if status != StatusCode::OK {
            return Err(IndexerError::Transport(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                path,
                ascii_snippet(&bytes)
            )));
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            IndexerError::Malformed(format!("{e}; body={}", ascii_snippet(&bytes)))
        })
    }
}

#[derive(Serialize)]
struct BlockRangeQuery<'a> {
    chain: &'a str,
    from_block: i64,
    to_block: i64,
    limit: i64,
}

#[derive(Serialize)]
struct TxHashesQuery<'a> {
    chain: &'a str,
    #[serde(rename = "transactionHashes")]
    transaction_hashes: Vec<String>,
}

#[derive(Serialize)]
struct WithdrawalStateQuery {
    #[serde(rename = "l1BatchNumbers[]")]
    l1_batch_numbers: Vec<i64>,
    max_block: i64,
    limit: i64,
}

#[derive(Deserialize)]
struct WireMessageSent {
    id: String,
    block_number: i64,
    transaction_hash: String,
    block_timestamp: DateTime<Utc>,
    payload_hex: String,
}

impl TryFrom<WireMessageSent> for MessageSent {
    type Error = IndexerError;
    fn try_from(w: WireMessageSent) -> Result<Self, Self::Error> {
        Ok(MessageSent {
            id: w.id,
            block_number: w.block_number,
            transaction_hash: parse_hash(&w.transaction_hash)?,
            block_timestamp: w.block_timestamp,
            payload: hex::decode(w.payload_hex.trim_start_matches("0x"))
                .map_err(|e| IndexerError::Malformed(e.to_string()))?,
        })
    }
}

#[derive(Deserialize)]
struct WireExecuted {
    id: String,
    block_number: i64,
    transaction_hash: String,
    vault_nonce: String,
    vault: String,
    receiver: String,
    shares: String,
}

impl TryFrom<WireExecuted> for DepositOrWithdrawalExecuted {
    type Error = IndexerError;
    fn try_from(w: WireExecuted) -> Result<Self, Self::Error> {
        Ok(DepositOrWithdrawalExecuted {
            id: w.id,
            block_number: w.block_number,
            transaction_hash: parse_hash(&w.transaction_hash)?,
            vault_nonce: U256::from_str(&w.vault_nonce)
                .map_err(|e| IndexerError::Malformed(e.to_string()))?,
            vault: Address::from_str(&w.vault).map_err(|e| IndexerError::Malformed(e.to_string()))?,
            receiver: Address::from_str(&w.receiver)
                .map_err(|e| IndexerError::Malformed(e.to_string()))?,
            shares: BigDecimal::from_str(&w.shares)
                .map_err(|e| IndexerError::Malformed(e.to_string()))?,
        })
    }
}

#[derive(Deserialize)]
struct WireWithdrawalStateUpdated {
    id: String,
    block_number: i64,
    transaction_hash: String,
    l1_batch: i64,
    exchange_rate: String,
    message_count: i64,
}

impl TryFrom<WireWithdrawalStateUpdated> for WithdrawalStateUpdated {
    type Error = IndexerError;
    fn try_from(w: WireWithdrawalStateUpdated) -> Result<Self, Self::Error> {
        Ok(WithdrawalStateUpdated {
            id: w.id,
            block_number: w.block_number,
            transaction_hash: parse_hash(&w.transaction_hash)?,
            l1_batch: w.l1_batch,
            exchange_rate: BigDecimal::from_str(&w.exchange_rate)
                .map_err(|e| IndexerError::Malformed(e.to_string()))?,
            message_count: w.message_count,
        })
    }
}

fn parse_hash(s: &str) -> Result<B256, IndexerError> {
    B256::from_str(s).map_err(|e| IndexerError::Malformed(e.to_string()))
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn message_sent_events(
        &self,
        stream: EventStream,
        from_block: i64,
        to_block: i64,
        limit: i64,
    ) -> Result<Vec<MessageSent>, IndexerError> {
        let chain = match stream {
            EventStream::MessageSent(c) => c,
            EventStream::Executed(c) => c,
        };
        let wire: Vec<WireMessageSent> = self
            .post_with_retry(
                "/events/message-sent",
                stream.label(),
                &BlockRangeQuery {
                    chain: chain.as_str(),
                    from_block,
                    to_block,
                    limit,
                },
            )
            .await?;
        wire.into_iter().map(TryInto::try_into).collect()
    }

    async fn executed_events(
        &self,
        stream: EventStream,
        from_block: i64,
        to_block: i64,
        limit: i64,
    ) -> Result<Vec<DepositOrWithdrawalExecuted>, IndexerError> {
        let chain = match stream {
            EventStream::MessageSent(c) => c,
            EventStream::Executed(c) => c,
        };
        let wire: Vec<WireExecuted> = self
            .post_with_retry(
                "/events/executed",
                stream.label(),
                &BlockRangeQuery {
                    chain: chain.as_str(),
                    from_block,
                    to_block,
                    limit,
                },
            )
            .await?;
        wire.into_iter().map(TryInto::try_into).collect()
    }

    async fn executed_events_by_tx_hashes(
        &self,
        stream: EventStream,
        hashes: &[B256],
    ) -> Result<Vec<DepositOrWithdrawalExecuted>, IndexerError> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let chain = match stream {
            EventStream::MessageSent(c) => c,
            EventStream::Executed(c) => c,
        };
        let wire: Vec<WireExecuted> = self
            .post_with_retry(
                "/events/executed-by-hashes",
                stream.label(),
                &TxHashesQuery {
                    chain: chain.as_str(),
                    transaction_hashes: hashes.iter().map(|h| format!("0x{h:x}")).collect(),
                },
            )
            .await?;
        wire.into_iter().map(TryInto::try_into).collect()
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
        let wire: Vec<WireWithdrawalStateUpdated> = self
            .post_with_retry(
                "/events/withdrawal-state-updated",
                "withdrawal_state_updated",
                &WithdrawalStateQuery {
                    l1_batch_numbers: batch_numbers.to_vec(),
                    max_block,
                    limit,
                },
            )
            .await?;
        wire.into_iter().map(TryInto::try_into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/events/message-sent"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/events/message-sent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let source = HttpEventSource::new(server.uri(), None, Duration::from_secs(2), 8);
        let result = source
            .message_sent_events(EventStream::MessageSent(Chain::Ethereum), 0, 100, 10)
            .await
            .expect("should succeed after retry");
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn surfaces_error_after_exhausting_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/events/message-sent"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = HttpEventSource::new(server.uri(), None, Duration::from_secs(2), 8);
        let result = source
            .message_sent_events(EventStream::MessageSent(Chain::Ethereum), 0, 100, 10)
            .await;
        assert!(result.is_err());
    }
}
