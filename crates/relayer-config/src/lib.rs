#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Boot-time configuration (§4.7, §6).
//!
//! All settings are read once from the environment (optionally layered under a
//! `.env` file via [`config::File`]), validated eagerly, and exposed as one
//! immutable [`RelayerConfig`] — there is no global config singleton. A failure in
//! any single field aborts startup with a [`ConfigError`] naming exactly which
//! field was at fault, before any worker, store, or indexer connection opens.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use bigdecimal::BigDecimal;
use relayer_types::ConfigError;
use serde::Deserialize;

/// Endpoints and signing material for one chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub fallback_rpc_urls: Vec<String>,
    pub bridge_address: Address,
    pub wait_block_confirmations: u64,
}

/// The destination-side L2 gas hints used when the relayer itself broadcasts on Via
/// (§6 `L2_GAS_PRICE`/`L2_GAS_LIMIT`/`L2_GAS_PER_PUBDATA`). Kept as `BigDecimal`
/// because these may exceed `u128` range once converted to wei-scale `U256`.
#[derive(Debug, Clone)]
pub struct L2GasHints {
    pub gas_price: BigDecimal,
    pub gas_limit: BigDecimal,
    pub gas_per_pubdata: BigDecimal,
}

#[derive(Debug, Clone)]
pub enum IndexerBackendConfig {
    Sql { database_url: String },
    Http { url: String, api_key: Option<String> },
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct RelayerConfig {
    pub ethereum: ChainConfig,
    pub via: ChainConfig,
    pub relayer_private_key: String,
    pub worker_polling_interval: Duration,
    pub transaction_batch_size: u32,
    pub withdrawal_finalization_confirmations: u64,
    pub pending_tx_timeout: Duration,
    pub l2_gas_hints: L2GasHints,
    pub store: StoreConfig,
    pub indexer: IndexerBackendConfig,
    pub rpc_request_timeout: Duration,
    pub indexer_retry_attempts: u32,
    pub metrics_addr: String,
}

/// Loose, string-typed mirror of the environment used as the `config`-crate
/// deserialization target before field-by-field validation below.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    eth_url: Option<String>,
    via_url: Option<String>,
    eth_fallback_urls: Option<String>,
    via_fallback_urls: Option<String>,
    ethereum_bridge_address: Option<String>,
    via_bridge_address: Option<String>,
    relayer_private_key: Option<String>,
    worker_polling_interval: Option<String>,
    transaction_batch_size: Option<String>,
    eth_wait_block_confirmations: Option<String>,
    via_wait_block_confirmations: Option<String>,
    withdrawal_finalization_confirmations: Option<String>,
    pending_tx_timeout_minutes: Option<String>,
    l2_gas_price: Option<String>,
    l2_gas_limit: Option<String>,
    l2_gas_per_pubdata: Option<String>,
    database_url: Option<String>,
    indexer_database_url: Option<String>,
    indexer_http_url: Option<String>,
    indexer_api_key: Option<String>,
    db_pool_size: Option<String>,
    rpc_request_timeout_ms: Option<String>,
    indexer_retry_attempts: Option<String>,
    metrics_addr: Option<String>,
}

impl RelayerConfig {
    /// Loads configuration from the process environment, optionally layered under
    /// `path` (a `.env`-style file) for local development. `path` is silently
    /// skipped if absent; environment variables always take precedence.
    pub fn load(dotenv_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = dotenv_path {
            if std::path::Path::new(path).exists() {
                builder = builder.add_source(config::File::with_name(path).required(false));
            }
        }
        builder = builder.add_source(config::Environment::default());
        let raw: RawConfig = builder
            .build()
            .map_err(|e| ConfigError::Invalid {
                field: "<environment>",
                reason: e.to_string(),
            })?
            .try_deserialize()
            .unwrap_or_default();
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let ethereum = ChainConfig {
            rpc_url: required(raw.eth_url, "ETH_URL")?,
            fallback_rpc_urls: split_urls(raw.eth_fallback_urls),
            bridge_address: parse_address(raw.ethereum_bridge_address, "ETHEREUM_BRIDGE_ADDRESS")?,
            wait_block_confirmations: parse_u64(
                raw.eth_wait_block_confirmations,
                "ETH_WAIT_BLOCK_CONFIRMATIONS",
                0,
            )?,
        };
        let via = ChainConfig {
            rpc_url: required(raw.via_url, "VIA_URL")?,
            fallback_rpc_urls: split_urls(raw.via_fallback_urls),
            bridge_address: parse_address(raw.via_bridge_address, "VIA_BRIDGE_ADDRESS")?,
            wait_block_confirmations: parse_u64(
                raw.via_wait_block_confirmations,
                "VIA_WAIT_BLOCK_CONFIRMATIONS",
                0,
            )?,
        };

        let relayer_private_key = required(raw.relayer_private_key, "RELAYER_PRIVATE_KEY")?;
        validate_private_key(&relayer_private_key)?;

        let polling_ms = parse_u64(raw.worker_polling_interval, "WORKER_POLLING_INTERVAL", 1000)?;
        if polling_ms < 1000 {
            return Err(ConfigError::BelowMinimum {
                field: "WORKER_POLLING_INTERVAL",
                min: 1000,
                actual: polling_ms,
            });
        }

        let batch_size = parse_u64(raw.transaction_batch_size, "TRANSACTION_BATCH_SIZE", 1)? as u32;
        if !(1..=100).contains(&batch_size) {
            return Err(ConfigError::Invalid {
                field: "TRANSACTION_BATCH_SIZE",
                reason: format!("must be between 1 and 100, got {batch_size}"),
            });
        }

        let withdrawal_finalization_confirmations = parse_u64(
            raw.withdrawal_finalization_confirmations,
            "WITHDRAWAL_FINALIZATION_CONFIRMATIONS",
            0,
        )?;

        let pending_timeout_minutes =
            parse_u64(raw.pending_tx_timeout_minutes, "PENDING_TX_TIMEOUT_MINUTES", 30)?;
        if pending_timeout_minutes < 5 {
            return Err(ConfigError::BelowMinimum {
                field: "PENDING_TX_TIMEOUT_MINUTES",
                min: 5,
                actual: pending_timeout_minutes,
            });
        }

        let l2_gas_hints = L2GasHints {
            gas_price: parse_decimal(raw.l2_gas_price, "L2_GAS_PRICE")?,
            gas_limit: parse_decimal(raw.l2_gas_limit, "L2_GAS_LIMIT")?,
            gas_per_pubdata: parse_decimal(raw.l2_gas_per_pubdata, "L2_GAS_PER_PUBDATA")?,
        };

        let store = StoreConfig {
            database_url: required(raw.database_url, "DATABASE_URL")?,
            pool_size: parse_u64(raw.db_pool_size, "DB_POOL_SIZE", 10)? as u32,
        };

        let indexer = match (raw.indexer_database_url, raw.indexer_http_url) {
            (Some(database_url), None) => IndexerBackendConfig::Sql { database_url },
            (None, Some(url)) => IndexerBackendConfig::Http {
                url,
                api_key: raw.indexer_api_key,
            },
            (None, None) => {
                return Err(ConfigError::Missing(
                    "INDEXER_DATABASE_URL or INDEXER_HTTP_URL",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid {
                    field: "INDEXER_DATABASE_URL / INDEXER_HTTP_URL",
                    reason: "exactly one indexer backend must be configured, not both".into(),
                })
            }
        };

        let rpc_request_timeout =
            Duration::from_millis(parse_u64(raw.rpc_request_timeout_ms, "RPC_REQUEST_TIMEOUT_MS", 5000)?);
        let indexer_retry_attempts =
            parse_u64(raw.indexer_retry_attempts, "INDEXER_RETRY_ATTEMPTS", 8)? as u32;

        let metrics_addr = raw
            .metrics_addr
            .unwrap_or_else(|| "127.0.0.1:9100".to_string());

        Ok(RelayerConfig {
            ethereum,
            via,
            relayer_private_key,
            worker_polling_interval: Duration::from_millis(polling_ms),
            transaction_batch_size: batch_size,
            withdrawal_finalization_confirmations,
            pending_tx_timeout: Duration::from_secs(pending_timeout_minutes * 60),
            l2_gas_hints,
            store,
            indexer,
            rpc_request_timeout,
            indexer_retry_attempts,
            metrics_addr,
        })
    }

    /// Used by `--config-check`: loading without error is the whole check.
    pub fn validate_only(dotenv_path: Option<&str>) -> Result<(), ConfigError> {
        Self::load(dotenv_path).map(|_| ())
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(field))
}

fn split_urls(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_address(value: Option<String>, field: &'static str) -> Result<Address, ConfigError> {
    let raw = required(value, field)?;
    Address::from_str(&raw).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

fn parse_u64(value: Option<String>, field: &'static str, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(s) => s.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
            field,
            reason: e.to_string(),
        }),
    }
}

fn parse_decimal(value: Option<String>, field: &'static str) -> Result<BigDecimal, ConfigError> {
    let raw = required(value, field)?;
    BigDecimal::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

fn validate_private_key(key: &str) -> Result<(), ConfigError> {
    let stripped = key.strip_prefix("0x").ok_or(ConfigError::Invalid {
        field: "RELAYER_PRIVATE_KEY",
        reason: "must be 0x-prefixed".into(),
    })?;
    if stripped.len() != 64 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::Invalid {
            field: "RELAYER_PRIVATE_KEY",
            reason: "must be exactly 64 hex characters after the 0x prefix".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_raw() -> RawConfig {
        RawConfig {
            eth_url: Some("http://eth.example".into()),
            via_url: Some("http://via.example".into()),
            ethereum_bridge_address: Some("0x0000000000000000000000000000000000000001".into()),
            via_bridge_address: Some("0x0000000000000000000000000000000000000002".into()),
            relayer_private_key: Some(format!("0x{}", "ab".repeat(32))),
            database_url: Some("postgres://localhost/relayer".into()),
            indexer_http_url: Some("http://indexer.example".into()),
            l2_gas_price: Some("250000000".into()),
            l2_gas_limit: Some("20000000".into()),
            l2_gas_per_pubdata: Some("800".into()),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_valid_config_loads() {
        let cfg = RelayerConfig::from_raw(base_raw()).expect("valid config");
        assert_eq!(cfg.transaction_batch_size, 1);
        assert_eq!(cfg.worker_polling_interval, Duration::from_millis(1000));
    }

    #[test]
    fn rejects_missing_required_field() {
        let mut raw = base_raw();
        raw.eth_url = None;
        let err = RelayerConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ETH_URL")));
    }

    #[test]
    fn rejects_polling_interval_below_floor() {
        let mut raw = base_raw();
        raw.worker_polling_interval = Some("100".into());
        let err = RelayerConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::BelowMinimum { field: "WORKER_POLLING_INTERVAL", .. }));
    }

    #[test]
    fn rejects_private_key_without_0x_prefix() {
        let mut raw = base_raw();
        raw.relayer_private_key = Some("ab".repeat(32));
        let err = RelayerConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "RELAYER_PRIVATE_KEY", .. }));
    }

    #[test]
    fn rejects_both_indexer_backends_configured() {
        let mut raw = base_raw();
        raw.indexer_database_url = Some("postgres://localhost/indexer".into());
        let err = RelayerConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "INDEXER_DATABASE_URL / INDEXER_HTTP_URL", .. }));
    }

    #[test]
    fn rejects_neither_indexer_backend_configured() {
        let mut raw = base_raw();
        raw.indexer_http_url = None;
        let err = RelayerConfig::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("INDEXER_DATABASE_URL or INDEXER_HTTP_URL")));
    }
}
