//! Immutable chain registry built once at startup.

use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::validation::ConfigIssue;
use crate::config::RevokerConfig;
use crate::error::ValidationError;

/// Everything the flow needs to know about one supported chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_key: String,
    pub rpc_endpoint: Url,
    pub failover_endpoints: Vec<Url>,
    pub chain_id: u64,
    pub relay_endpoint: Url,
    /// Blocks past a bundle's target block during which the relay still
    /// tracks it.
    pub relay_tracking_blocks: u64,
}

/// Chain key → context lookup. Unknown keys are an error, never a default.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<String, Arc<ChainContext>>,
}

impl ChainRegistry {
    pub fn new(contexts: impl IntoIterator<Item = ChainContext>) -> Self {
        let chains = contexts
            .into_iter()
            .map(|ctx| (ctx.chain_key.clone(), Arc::new(ctx)))
            .collect();
        Self { chains }
    }

    /// Build the registry from a validated configuration.
    pub fn from_config(config: &RevokerConfig) -> Result<Self, ConfigError> {
        let parse = |path: String, raw: &str| {
            Url::parse(raw).map_err(|e| {
                ConfigError::Validation(vec![ConfigIssue {
                    path,
                    message: format!("invalid URL '{raw}': {e}"),
                }])
            })
        };

        let mut contexts = Vec::with_capacity(config.chains.len());
        for (key, chain) in &config.chains {
            let failover_endpoints = chain
                .failover_urls
                .iter()
                .enumerate()
                .map(|(i, u)| parse(format!("chains.{key}.failover_urls[{i}]"), u))
                .collect::<Result<Vec<_>, _>>()?;
            let relay_raw = chain.relay_url.as_deref().unwrap_or(&config.relay.url);

            contexts.push(ChainContext {
                chain_key: key.clone(),
                rpc_endpoint: parse(format!("chains.{key}.rpc_url"), &chain.rpc_url)?,
                failover_endpoints,
                chain_id: chain.chain_id,
                relay_endpoint: parse(format!("chains.{key}.relay_url"), relay_raw)?,
                relay_tracking_blocks: chain.relay_tracking_blocks,
            });
        }

        Ok(Self::new(contexts))
    }

    /// Resolve a caller-supplied chain key.
    pub fn resolve(&self, chain_key: &str) -> Result<Arc<ChainContext>, ValidationError> {
        let normalized = chain_key.trim().to_ascii_lowercase();
        self.chains
            .get(&normalized)
            .cloned()
            .ok_or_else(|| ValidationError::UnsupportedChain(chain_key.to_string()))
    }

    /// All registered chains, sorted by key.
    pub fn chains(&self) -> Vec<Arc<ChainContext>> {
        let mut all: Vec<_> = self.chains.values().cloned().collect();
        all.sort_by(|a, b| a.chain_key.cmp(&b.chain_key));
        all
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
