//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::blockchain::wallet::SignerKey;
use crate::config::schema::RevokerConfig;
use crate::config::validation::{validate_config, ConfigIssue};

/// Environment variable carrying the sponsor account key.
pub const SPONSOR_KEY_ENV_VAR: &str = "REVOKER_SPONSOR_PRIVATE_KEY";

/// Environment variable overriding the default relay endpoint.
pub const RELAY_URL_ENV_VAR: &str = "REVOKER_RELAY_URL";

/// Older deployments configure the relay under this name.
pub const LEGACY_RELAY_URL_ENV_VAR: &str = "FLASHBOTS_RELAY";

pub const BIND_ADDRESS_ENV_VAR: &str = "REVOKER_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ConfigIssue>),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file (or defaults when `path` is `None`), apply process
/// environment overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<RevokerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => RevokerConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides through `lookup`.
///
/// `<CHAIN>_RPC` replaces the RPC URL of an already configured chain,
/// e.g. `ETHEREUM_RPC` for `chains.ethereum`.
pub fn apply_env_overrides<F>(config: &mut RevokerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (key, chain) in config.chains.iter_mut() {
        let var = format!("{}_RPC", key.to_uppercase().replace('-', "_"));
        if let Some(url) = lookup(&var).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(chain = %key, env = %var, "RPC URL overridden from environment");
            chain.rpc_url = url;
        }
    }

    if let Some(url) = lookup(RELAY_URL_ENV_VAR)
        .or_else(|| lookup(LEGACY_RELAY_URL_ENV_VAR))
        .filter(|v| !v.trim().is_empty())
    {
        config.relay.url = url;
    }

    if let Some(addr) = lookup(BIND_ADDRESS_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        config.listener.bind_address = addr;
    }

    if let Some(key) = lookup(SPONSOR_KEY_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        config.sponsor.private_key = Some(SignerKey::new(key));
    }
}
