//! Startup orchestration.
//!
//! Builds every long-lived component from a validated [`RevokerConfig`] in
//! dependency order: registry, RPC clients, relay identity and clients,
//! then the orchestrator.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::client::RpcSelector;
use crate::blockchain::registry::ChainRegistry;
use crate::blockchain::transaction::TransactionBuilder;
use crate::blockchain::wallet::{SignError, Wallet};
use crate::config::{ConfigError, RevokerConfig, SponsorMode};
use crate::relay::client::RelaySelector;
use crate::relay::submitter::RelaySubmitter;
use crate::relay::tracker::BundleStatusTracker;
use crate::relay::types::RelayError;
use crate::resilience::RetryPolicy;
use crate::revocation::nonce::NonceManager;
use crate::revocation::orchestrator::SponsoredRevocationOrchestrator;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("sponsor key: {0}")]
    SponsorKey(#[from] SignError),

    #[error("sponsor mode fund_in_bundle requires a sponsor key")]
    MissingSponsor,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

pub async fn build_orchestrator(
    config: &RevokerConfig,
) -> Result<SponsoredRevocationOrchestrator, StartupError> {
    let registry = Arc::new(ChainRegistry::from_config(config)?);
    let rpcs = RpcSelector::connect(&registry, Duration::from_secs(config.timeouts.rpc_secs)).await;

    let sponsor = config
        .sponsor
        .private_key
        .as_ref()
        .map(Wallet::from_key)
        .transpose()?
        .map(Arc::new);

    let identity = match &sponsor {
        Some(wallet) => wallet.clone(),
        None => {
            let wallet = Arc::new(Wallet::random());
            tracing::info!(
                identity = %wallet.address(),
                "No sponsor key configured, using an ephemeral relay identity"
            );
            wallet
        }
    };
    let relays = RelaySelector::connect(
        &registry,
        identity,
        Duration::from_secs(config.relay.timeout_secs),
    )?;

    let retry = RetryPolicy::from_config(&config.retries);
    let orchestrator = SponsoredRevocationOrchestrator::new(
        registry,
        rpcs.clone(),
        TransactionBuilder::new(config.gas.clone(), retry),
        RelaySubmitter::new(relays.clone(), retry),
        BundleStatusTracker::new(relays, rpcs, &config.status),
        NonceManager::new(Duration::from_secs(config.nonce.reservation_ttl_secs)),
    );

    let orchestrator = match config.sponsor.mode {
        SponsorMode::RelayOnly => orchestrator,
        SponsorMode::FundInBundle => {
            let sponsor = sponsor.ok_or(StartupError::MissingSponsor)?;
            tracing::info!(sponsor = %sponsor.address(), "Sponsor funding enabled");
            orchestrator.with_funding_sponsor(sponsor)
        }
    };

    tracing::info!(
        chains = orchestrator.registry().len(),
        sponsor_mode = ?config.sponsor.mode,
        "Revocation service initialized"
    );
    Ok(orchestrator)
}
