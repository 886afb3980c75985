//! Bundle submission with bounded retry.

use std::time::Instant;

use crate::blockchain::registry::ChainContext;
use crate::error::Classify;
use crate::observability::metrics;
use crate::relay::client::RelaySelector;
use crate::relay::types::{Bundle, BundleHandle, RelayError};
use crate::resilience::RetryPolicy;

/// Relay limit on transactions per bundle.
pub const MAX_BUNDLE_TRANSACTIONS: usize = 100;
/// Relay limit on the total size of a bundle's raw transactions.
pub const MAX_BUNDLE_BYTES: usize = 300_000;

#[derive(Debug, Clone)]
pub struct RelaySubmitter {
    relays: RelaySelector,
    retry: RetryPolicy,
}

impl RelaySubmitter {
    pub fn new(relays: RelaySelector, retry: RetryPolicy) -> Self {
        Self { relays, retry }
    }

    /// Submit `bundle` to the relay serving `ctx`.
    ///
    /// Rejections are returned immediately; unavailability is retried with
    /// backoff and surfaced once attempts run out.
    pub async fn submit(&self, bundle: &Bundle, ctx: &ChainContext) -> Result<BundleHandle, RelayError> {
        let txs = bundle.transactions().len();
        let bytes = bundle.encoded_size();
        if txs > MAX_BUNDLE_TRANSACTIONS || bytes > MAX_BUNDLE_BYTES {
            return Err(RelayError::TooLarge { txs, bytes });
        }

        let relay = self.relays.for_chain(ctx)?;
        let start = Instant::now();
        let result = self
            .retry
            .run("eth_sendBundle", || relay.send_bundle(bundle))
            .await;
        let elapsed = start.elapsed();

        match result {
            Ok(bundle_id) => {
                metrics::record_relay_submission(&ctx.chain_key, "accepted", elapsed);
                tracing::info!(
                    chain = %ctx.chain_key,
                    bundle_id = %bundle_id,
                    txs,
                    target_block = ?bundle.target_block(),
                    "Bundle accepted by relay"
                );
                Ok(BundleHandle {
                    bundle_id,
                    chain_key: ctx.chain_key.clone(),
                    tx_hashes: bundle.tx_hashes(),
                    target_block: bundle.target_block(),
                })
            }
            Err(e) => {
                metrics::record_relay_submission(&ctx.chain_key, e.kind().to_string().as_str(), elapsed);
                tracing::warn!(chain = %ctx.chain_key, error = %e, "Bundle submission failed");
                Err(e)
            }
        }
    }
}
