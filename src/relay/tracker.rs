//! Bundle status derivation.
//!
//! The relay's view is authoritative while it still tracks a bundle. Once it
//! forgets (or cannot be reached), the chain decides: the bundle's expected
//! transaction hashes are looked up with `eth_getTransactionByHash`.
//!
//! ```text
//! relay stats ── simulation error ──────────────→ Failed
//!      │ known ── mined ────────────────────────→ Included(n)
//!      │       └─ not mined: head ≤ target ─────→ Pending
//!      │                     head > target ─────→ NotIncluded
//!      │                     no target ─────────→ Pending
//!      │       └─ chain lookup failed ──────────→ Pending
//!      │ unknown / error ── mined ──────────────→ Included(n)
//!      │       └─ not mined: head ≤ target+N ───→ Pending
//!      │                     head > target+N ───→ NotIncluded
//!      │                     no target ─────────→ Pending, or Unknown
//!      │                                          without tx hashes
//!      │       └─ chain lookup failed ──────────→ Unknown
//! ```
//!
//! `NotIncluded` needs a known target block that the head has passed.

use alloy::primitives::B256;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::blockchain::client::{ChainRpc, RpcSelector};
use crate::blockchain::registry::ChainContext;
use crate::blockchain::types::{BlockchainError, TransactionLookup};
use crate::config::StatusConfig;
use crate::error::{Classify, ErrorKind};
use crate::observability::metrics;
use crate::relay::client::RelaySelector;
use crate::relay::types::{BundleHandle, BundleStatus, RelayError};

/// Wiring failures. Upstream failures become [`BundleStatus::Unknown`].
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl Classify for TrackerError {
    fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::Chain(e) => e.kind(),
            TrackerError::Relay(e) => e.kind(),
        }
    }
}

/// What the chain says about a bundle's transactions.
enum ChainView {
    Mined(u64),
    NotMined { head: u64 },
}

#[derive(Debug, Clone)]
pub struct BundleStatusTracker {
    relays: RelaySelector,
    rpcs: RpcSelector,
    poll_interval: Duration,
    max_poll_interval: Duration,
}

impl BundleStatusTracker {
    pub fn new(relays: RelaySelector, rpcs: RpcSelector, config: &StatusConfig) -> Self {
        Self {
            relays,
            rpcs,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            max_poll_interval: Duration::from_millis(config.max_poll_interval_ms.max(config.poll_interval_ms)),
        }
    }

    /// Current status of `handle`. Never cached.
    pub async fn status(&self, ctx: &ChainContext, handle: &BundleHandle) -> Result<BundleStatus, TrackerError> {
        let relay = self.relays.for_chain(ctx)?;
        let rpc = self.rpcs.for_chain(ctx)?;

        let relay_view = relay
            .bundle_status(&handle.bundle_id, handle.target_block)
            .await;
        let status = match relay_view {
            Ok(Some(stats)) => match stats.simulation_error {
                Some(reason) => BundleStatus::Failed { reason },
                None => match self.chain_view(rpc.as_ref(), handle).await {
                    Some(ChainView::Mined(block_number)) => BundleStatus::Included { block_number },
                    Some(ChainView::NotMined { head }) if past(head, handle.target_block, 0) => {
                        BundleStatus::NotIncluded
                    }
                    Some(ChainView::NotMined { .. }) | None => BundleStatus::Pending,
                },
            },
            Ok(None) => self.fallback_status(ctx, rpc.as_ref(), handle).await,
            Err(e) => {
                tracing::warn!(chain = %ctx.chain_key, bundle_id = %handle.bundle_id, error = %e, "Relay status lookup failed, using chain");
                self.fallback_status(ctx, rpc.as_ref(), handle).await
            }
        };

        metrics::record_bundle_status(&ctx.chain_key, status.label());
        tracing::debug!(
            chain = %ctx.chain_key,
            bundle_id = %handle.bundle_id,
            status = status.label(),
            "Bundle status resolved"
        );
        Ok(status)
    }

    /// Poll until the status is terminal or `max_wait` elapses.
    pub async fn wait_until_settled(
        &self,
        ctx: &ChainContext,
        handle: &BundleHandle,
        max_wait: Duration,
    ) -> Result<BundleStatus, TrackerError> {
        let deadline = Instant::now() + max_wait;
        let mut interval = self.poll_interval;

        loop {
            let status = self.status(ctx, handle).await?;
            let now = Instant::now();
            if status.is_terminal() || now >= deadline {
                return Ok(status);
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(self.max_poll_interval);
        }
    }

    /// Status from the chain alone, for bundles the relay cannot speak for.
    async fn fallback_status(
        &self,
        ctx: &ChainContext,
        rpc: &dyn ChainRpc,
        handle: &BundleHandle,
    ) -> BundleStatus {
        match self.chain_view(rpc, handle).await {
            Some(ChainView::Mined(block_number)) => BundleStatus::Included { block_number },
            Some(ChainView::NotMined { head }) if past(head, handle.target_block, ctx.relay_tracking_blocks) => {
                BundleStatus::NotIncluded
            }
            Some(ChainView::NotMined { .. }) if handle.target_block.is_none() && handle.tx_hashes.is_empty() => {
                BundleStatus::Unknown
            }
            Some(ChainView::NotMined { .. }) => BundleStatus::Pending,
            None => BundleStatus::Unknown,
        }
    }

    /// `None` when the chain could not be asked or there is nothing to ask about.
    async fn chain_view(&self, rpc: &dyn ChainRpc, handle: &BundleHandle) -> Option<ChainView> {
        let hashes = candidate_hashes(handle);
        if hashes.is_empty() {
            return None;
        }

        for hash in &hashes {
            match rpc.transaction_by_hash(*hash).await {
                Ok(Some(TransactionLookup::Mined { block_number })) => {
                    return Some(ChainView::Mined(block_number));
                }
                Ok(Some(TransactionLookup::Pending)) | Ok(None) => {}
                Err(e) => {
                    tracing::warn!(chain = %handle.chain_key, tx_hash = %hash, error = %e, "Transaction lookup failed");
                    return None;
                }
            }
        }

        match rpc.block_number().await {
            Ok(head) => Some(ChainView::NotMined { head }),
            Err(e) => {
                tracing::warn!(chain = %handle.chain_key, error = %e, "Head block lookup failed");
                None
            }
        }
    }
}

/// Hashes to look for on chain: the bundle's transactions, or the bundle id
/// itself when it is a 32-byte hash and nothing else is known.
fn candidate_hashes(handle: &BundleHandle) -> Vec<B256> {
    if !handle.tx_hashes.is_empty() {
        return handle.tx_hashes.clone();
    }
    B256::from_str(&handle.bundle_id)
        .map(|hash| vec![hash])
        .unwrap_or_default()
}

/// Whether `head` is beyond `target + grace`. An unknown target never is.
fn past(head: u64, target: Option<u64>, grace: u64) -> bool {
    target.is_some_and(|target| head > target.saturating_add(grace))
}
