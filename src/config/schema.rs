//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the revoker.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::blockchain::wallet::SignerKey;

/// Root configuration for the revocation service.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RevokerConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Supported chains keyed by the chain key callers send (e.g. "ethereum").
    pub chains: BTreeMap<String, ChainConfig>,

    /// Private relay settings.
    pub relay: RelayConfig,

    /// Gas pricing policy.
    pub gas: GasConfig,

    /// Retry configuration for transient upstream failures.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Local nonce tracking.
    pub nonce: NonceConfig,

    /// Bundle status polling.
    pub status: StatusConfig,

    /// Sponsor (gas-paying) account settings.
    pub sponsor: SponsorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for RevokerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            chains: default_chains(),
            relay: RelayConfig::default(),
            gas: GasConfig::default(),
            retries: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            nonce: NonceConfig::default(),
            status: StatusConfig::default(),
            sponsor: SponsorConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Per-chain endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, tried in order.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Numeric chain id bound into every signature.
    pub chain_id: u64,

    /// Relay endpoint for this chain; falls back to `relay.url`.
    #[serde(default)]
    pub relay_url: Option<String>,

    /// Blocks past the target block during which the relay is trusted
    /// to know about a bundle.
    #[serde(default = "default_relay_tracking_blocks")]
    pub relay_tracking_blocks: u64,
}

fn default_relay_tracking_blocks() -> u64 {
    25
}

impl ChainConfig {
    pub fn with_rpc(rpc_url: &str, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            failover_urls: Vec::new(),
            chain_id,
            relay_url: None,
            relay_tracking_blocks: default_relay_tracking_blocks(),
        }
    }
}

/// Canonical chain ids for the chain keys the service knows by name.
pub const WELL_KNOWN_CHAINS: &[(&str, u64)] = &[
    ("ethereum", 1),
    ("polygon", 137),
    ("arbitrum", 42161),
    ("optimism", 10),
    ("base", 8453),
];

fn default_chains() -> BTreeMap<String, ChainConfig> {
    let urls = [
        ("ethereum", "https://eth-mainnet.g.alchemy.com/v2/demo"),
        ("polygon", "https://polygon-mainnet.g.alchemy.com/v2/demo"),
        ("arbitrum", "https://arb-mainnet.g.alchemy.com/v2/demo"),
        ("optimism", "https://opt-mainnet.g.alchemy.com/v2/demo"),
        ("base", "https://base-mainnet.g.alchemy.com/v2/demo"),
    ];
    WELL_KNOWN_CHAINS
        .iter()
        .zip(urls)
        .map(|((key, id), (_, url))| (key.to_string(), ChainConfig::with_rpc(url, *id)))
        .collect()
}

/// Private relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Default relay endpoint for chains without their own `relay_url`.
    pub url: String,

    /// Relay request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "https://relay.flashbots.net".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Gas pricing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Fixed gas limit for a single ERC-20 `approve` call.
    pub approve_gas_limit: u64,

    /// Gas price multiplier (1.0 = network price, 1.2 = 20% buffer).
    pub price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Check the fixed limit against `eth_estimateGas` before signing.
    pub estimate: bool,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            approve_gas_limit: 100_000,
            price_multiplier: 1.0,
            max_gas_price_gwei: 500,
            estimate: true,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request timeout in seconds.
    pub request_secs: u64,

    /// Per-call JSON-RPC timeout in seconds.
    pub rpc_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            rpc_secs: 10,
        }
    }
}

/// Local nonce tracking.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NonceConfig {
    /// How long a nonce handed to the relay is trusted over the chain's
    /// pending count. Bundles that never land stop blocking the account
    /// after this window.
    pub reservation_ttl_secs: u64,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            reservation_ttl_secs: 300,
        }
    }
}

/// Bundle status polling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Upper bound for `waitSecs` on the status endpoint.
    pub max_wait_secs: u64,

    /// First poll interval in milliseconds; doubles up to `max_poll_interval_ms`.
    pub poll_interval_ms: u64,

    pub max_poll_interval_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: 30,
            poll_interval_ms: 1000,
            max_poll_interval_ms: 8000,
        }
    }
}

/// How the sponsor account takes part in a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SponsorMode {
    /// The sponsor key only authenticates relay requests.
    #[default]
    RelayOnly,
    /// The sponsor funds the signer's gas with a transfer placed first in the bundle.
    FundInBundle,
}

/// Sponsor (gas-paying) account configuration.
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SponsorConfig {
    pub mode: SponsorMode,

    /// Loaded from the environment only; never read from or written to files.
    #[serde(skip)]
    pub private_key: Option<SignerKey>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chains_are_canonical() {
        let config = RevokerConfig::default();
        assert_eq!(config.chains.len(), 5);
        assert_eq!(config.chains["ethereum"].chain_id, 1);
        assert_eq!(config.chains["polygon"].chain_id, 137);
        assert_eq!(config.chains["arbitrum"].chain_id, 42161);
        assert_eq!(config.chains["optimism"].chain_id, 10);
        assert_eq!(config.chains["base"].chain_id, 8453);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RevokerConfig = toml::from_str(
            r#"
            [gas]
            approve_gas_limit = 120000

            [sponsor]
            mode = "fund_in_bundle"
            "#,
        )
        .unwrap();
        assert_eq!(config.gas.approve_gas_limit, 120_000);
        assert_eq!(config.gas.max_gas_price_gwei, 500);
        assert_eq!(config.sponsor.mode, SponsorMode::FundInBundle);
        assert!(config.sponsor.private_key.is_none());
        assert_eq!(config.retries.max_attempts, 3);
    }

    #[test]
    fn test_chain_section_defaults() {
        let config: RevokerConfig = toml::from_str(
            r#"
            [chains.ethereum]
            rpc_url = "http://localhost:8545"
            chain_id = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.chains.len(), 1);
        let eth = &config.chains["ethereum"];
        assert_eq!(eth.relay_tracking_blocks, 25);
        assert!(eth.failover_urls.is_empty());
        assert!(eth.relay_url.is_none());
    }
}
