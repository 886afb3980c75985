//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, gas limits sane)
//! - Check chain keys against their canonical chain ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RevokerConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::fmt;

use crate::config::schema::{RevokerConfig, SponsorMode, WELL_KNOWN_CHAINS};

/// Single ERC-20 `approve` worst case: 21k intrinsic + cold SSTORE + calldata.
const MIN_APPROVE_GAS_LIMIT: u64 = 45_000;

/// A semantic problem found in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub path: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration, collecting every issue.
pub fn validate_config(config: &RevokerConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        issues.push(ConfigIssue::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.chains.is_empty() {
        issues.push(ConfigIssue::new("chains", "at least one chain is required"));
    }

    let mut seen_ids: HashMap<u64, &str> = HashMap::new();
    for (key, chain) in &config.chains {
        let path = format!("chains.{key}");

        if key.trim().is_empty() || key.trim() != key || key.to_lowercase() != *key {
            issues.push(ConfigIssue::new(&path, "chain keys must be lowercase without surrounding spaces"));
        }

        if let Some((_, canonical)) = WELL_KNOWN_CHAINS.iter().find(|(k, _)| k == key) {
            if chain.chain_id != *canonical {
                issues.push(ConfigIssue::new(
                    format!("{path}.chain_id"),
                    format!("'{key}' has canonical chain id {canonical}, got {}", chain.chain_id),
                ));
            }
        }

        if let Some(other) = seen_ids.insert(chain.chain_id, key) {
            issues.push(ConfigIssue::new(
                format!("{path}.chain_id"),
                format!("chain id {} already used by '{other}'", chain.chain_id),
            ));
        }

        if url::Url::parse(&chain.rpc_url).is_err() {
            issues.push(ConfigIssue::new(format!("{path}.rpc_url"), "invalid URL"));
        }
        for (i, failover) in chain.failover_urls.iter().enumerate() {
            if url::Url::parse(failover).is_err() {
                issues.push(ConfigIssue::new(format!("{path}.failover_urls[{i}]"), "invalid URL"));
            }
        }
        if let Some(relay) = &chain.relay_url {
            if url::Url::parse(relay).is_err() {
                issues.push(ConfigIssue::new(format!("{path}.relay_url"), "invalid URL"));
            }
        }
    }

    if url::Url::parse(&config.relay.url).is_err() {
        issues.push(ConfigIssue::new("relay.url", "invalid URL"));
    }
    if config.relay.timeout_secs == 0 {
        issues.push(ConfigIssue::new("relay.timeout_secs", "must be greater than 0"));
    }

    if config.gas.approve_gas_limit < MIN_APPROVE_GAS_LIMIT {
        issues.push(ConfigIssue::new(
            "gas.approve_gas_limit",
            format!("must be at least {MIN_APPROVE_GAS_LIMIT} to cover a cold approve"),
        ));
    }
    if !(config.gas.price_multiplier.is_finite() && config.gas.price_multiplier >= 1.0) {
        issues.push(ConfigIssue::new("gas.price_multiplier", "must be a finite value >= 1.0"));
    }
    if config.gas.max_gas_price_gwei == 0 {
        issues.push(ConfigIssue::new("gas.max_gas_price_gwei", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        issues.push(ConfigIssue::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        issues.push(ConfigIssue::new("retries.base_delay_ms", "must not exceed max_delay_ms"));
    }

    if config.timeouts.rpc_secs == 0 {
        issues.push(ConfigIssue::new("timeouts.rpc_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        issues.push(ConfigIssue::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.status.poll_interval_ms == 0 {
        issues.push(ConfigIssue::new("status.poll_interval_ms", "must be greater than 0"));
    }

    if config.sponsor.mode == SponsorMode::FundInBundle && config.sponsor.private_key.is_none() {
        issues.push(ConfigIssue::new(
            "sponsor.private_key",
            "fund_in_bundle requires REVOKER_SPONSOR_PRIVATE_KEY",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        issues.push(ConfigIssue::new("observability.metrics_address", "not a socket address"));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RevokerConfig::default()).is_ok());
    }

    #[test]
    fn test_non_canonical_chain_id_rejected() {
        let mut config = RevokerConfig::default();
        config.chains.get_mut("polygon").unwrap().chain_id = 1;

        let issues = validate_config(&config).unwrap_err();
        assert!(issues.iter().any(|i| i.path == "chains.polygon.chain_id"
            && i.message.contains("canonical chain id 137")));
        // Also collides with ethereum.
        assert!(issues.iter().any(|i| i.message.contains("already used")));
    }

    #[test]
    fn test_collects_all_issues() {
        let mut config = RevokerConfig::default();
        config.gas.approve_gas_limit = 21_000;
        config.retries.max_attempts = 0;
        config.relay.url = "not a url".into();

        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_fund_in_bundle_requires_key() {
        let mut config = RevokerConfig::default();
        config.sponsor.mode = SponsorMode::FundInBundle;
        let issues = validate_config(&config).unwrap_err();
        assert_eq!(issues[0].path, "sponsor.private_key");
    }
}
