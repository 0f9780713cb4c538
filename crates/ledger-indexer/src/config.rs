//! # Ingestion Configuration
//!
//! Configuration for the ingestion service and its processing engine.
//!
//! Values start from [`IngestConfig::default`] and may be overridden by
//! `INDEXER_*` environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `INDEXER_NETWORK_PASSPHRASE` | `network_passphrase` |
//! | `INDEXER_RPC_URL` | `rpc_url` |
//! | `INDEXER_START_LEDGER` | `start_ledger` |
//! | `INDEXER_END_LEDGER` | `end_ledger` |
//! | `INDEXER_LEDGER_BACKEND` | `ledger_backend` (`rpc` or `datastore`) |
//! | `INDEXER_GET_LEDGERS_LIMIT` | `get_ledgers_limit` |
//! | `INDEXER_WORKER_COUNT` | `worker_count` |
//! | `INDEXER_RETRY_BACKOFF_MS` | `retry_backoff_ms` |
//! | `INDEXER_SKIP_TX_META` | `skip_tx_meta` |
//! | `INDEXER_SKIP_TX_ENVELOPE` | `skip_tx_envelope` |
//! | `INDEXER_ENABLE_PARTICIPANT_FILTERING` | `enable_participant_filtering` |
//! | `INDEXER_REGISTERED_ACCOUNTS` | `registered_accounts` (comma separated) |

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::application::IndexerOptions;
use crate::domain::{
    NetworkId, DEFAULT_GET_LEDGERS_LIMIT, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_RPC_URL,
    TESTNET_PASSPHRASE,
};

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Backend type unknown or not implemented.
    #[error("Unsupported ledger backend: {0}")]
    UnsupportedBackend(String),

    /// Value could not be parsed or is out of range.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name
        key: &'static str,
        /// Rejected value
        value: String,
    },

    /// Bounded range whose end does not lie above its start.
    #[error("Invalid ledger range: end {end} must be greater than start {start}")]
    InvalidRange {
        /// First ledger
        start: u32,
        /// Exclusive bound
        end: u32,
    },

    /// Required setting left empty.
    #[error("Missing required setting: {0}")]
    MissingValue(&'static str),
}

/// Where ledgers are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackendType {
    /// Stellar RPC `getLedgers`
    #[default]
    Rpc,
    /// Ledger archive in object storage
    Datastore,
}

impl FromStr for LedgerBackendType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rpc" => Ok(Self::Rpc),
            "datastore" => Ok(Self::Datastore),
            _ => Err(ConfigError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for LedgerBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc => f.write_str("rpc"),
            Self::Datastore => f.write_str("datastore"),
        }
    }
}

/// Ingestion configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Network passphrase, hashed into the network id.
    pub network_passphrase: String,

    /// RPC endpoint for the `rpc` backend.
    pub rpc_url: String,

    /// First ledger to ingest.
    pub start_ledger: u32,

    /// Exclusive upper bound; 0 tails the network forever.
    pub end_ledger: u32,

    /// Ledger backend.
    pub ledger_backend: LedgerBackendType,

    /// Ledgers requested per backend call.
    pub get_ledgers_limit: u32,

    /// Threads in the per-ledger worker pool.
    pub worker_count: usize,

    /// Pause between attempts to fetch an unavailable ledger.
    pub retry_backoff_ms: u64,

    /// Drop result meta XDR before buffering.
    pub skip_tx_meta: bool,

    /// Drop envelope XDR before buffering.
    pub skip_tx_envelope: bool,

    /// Keep only transactions touching a registered account.
    pub enable_participant_filtering: bool,

    /// Accounts kept when participant filtering is on.
    pub registered_accounts: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            start_ledger: 0,
            end_ledger: 0,
            ledger_backend: LedgerBackendType::Rpc,
            get_ledgers_limit: DEFAULT_GET_LEDGERS_LIMIT,
            worker_count: num_cpus::get(),
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            skip_tx_meta: false,
            skip_tx_envelope: false,
            enable_participant_filtering: false,
            registered_accounts: Vec::new(),
        }
    }
}

impl IngestConfig {
    /// Create a config for testing (small pool, short backoff).
    pub fn for_testing() -> Self {
        Self {
            worker_count: 2,
            retry_backoff_ms: 1,
            ..Self::default()
        }
    }

    /// Default config with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `INDEXER_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("INDEXER_NETWORK_PASSPHRASE") {
            self.network_passphrase = value;
        }
        if let Some(value) = lookup("INDEXER_RPC_URL") {
            self.rpc_url = value;
        }
        if let Some(value) = lookup("INDEXER_START_LEDGER") {
            self.start_ledger = parse_number("INDEXER_START_LEDGER", &value)?;
        }
        if let Some(value) = lookup("INDEXER_END_LEDGER") {
            self.end_ledger = parse_number("INDEXER_END_LEDGER", &value)?;
        }
        if let Some(value) = lookup("INDEXER_LEDGER_BACKEND") {
            self.ledger_backend = value.parse()?;
        }
        if let Some(value) = lookup("INDEXER_GET_LEDGERS_LIMIT") {
            self.get_ledgers_limit = parse_number("INDEXER_GET_LEDGERS_LIMIT", &value)?;
        }
        if let Some(value) = lookup("INDEXER_WORKER_COUNT") {
            self.worker_count = parse_number("INDEXER_WORKER_COUNT", &value)?;
        }
        if let Some(value) = lookup("INDEXER_RETRY_BACKOFF_MS") {
            self.retry_backoff_ms = parse_number("INDEXER_RETRY_BACKOFF_MS", &value)?;
        }
        if let Some(value) = lookup("INDEXER_SKIP_TX_META") {
            self.skip_tx_meta = parse_flag("INDEXER_SKIP_TX_META", &value)?;
        }
        if let Some(value) = lookup("INDEXER_SKIP_TX_ENVELOPE") {
            self.skip_tx_envelope = parse_flag("INDEXER_SKIP_TX_ENVELOPE", &value)?;
        }
        if let Some(value) = lookup("INDEXER_ENABLE_PARTICIPANT_FILTERING") {
            self.enable_participant_filtering =
                parse_flag("INDEXER_ENABLE_PARTICIPANT_FILTERING", &value)?;
        }
        if let Some(value) = lookup("INDEXER_REGISTERED_ACCOUNTS") {
            self.registered_accounts = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_passphrase.is_empty() {
            return Err(ConfigError::MissingValue("network_passphrase"));
        }
        if self.ledger_backend == LedgerBackendType::Datastore {
            return Err(ConfigError::UnsupportedBackend(self.ledger_backend.to_string()));
        }
        if self.ledger_backend == LedgerBackendType::Rpc && self.rpc_url.is_empty() {
            return Err(ConfigError::MissingValue("rpc_url"));
        }
        if self.end_ledger != 0 && self.end_ledger <= self.start_ledger {
            return Err(ConfigError::InvalidRange {
                start: self.start_ledger,
                end: self.end_ledger,
            });
        }
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "worker_count",
                value: "0".to_string(),
            });
        }
        if self.get_ledgers_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "get_ledgers_limit",
                value: "0".to_string(),
            });
        }
        if self.enable_participant_filtering && self.registered_accounts.is_empty() {
            return Err(ConfigError::MissingValue("registered_accounts"));
        }
        Ok(())
    }

    /// Network id derived from the passphrase.
    pub fn network_id(&self) -> NetworkId {
        NetworkId::from_passphrase(&self.network_passphrase)
    }

    /// Pause between fetch attempts.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Engine options.
    pub fn indexer_options(&self) -> IndexerOptions {
        let participant_filter = self
            .enable_participant_filtering
            .then(|| self.registered_accounts.iter().cloned().collect::<HashSet<_>>());
        IndexerOptions {
            skip_tx_meta: self.skip_tx_meta,
            skip_tx_envelope: self.skip_tx_envelope,
            participant_filter,
        }
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
