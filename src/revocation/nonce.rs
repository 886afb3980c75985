//! Per-account nonce serialization.
//!
//! Bundles sent to a private relay stay invisible to the public mempool, so
//! `eth_getTransactionCount(pending)` keeps reporting the old nonce until the
//! bundle lands. Requests for the same (chain, account) therefore queue on a
//! lease, and a committed nonce is remembered for a while so the next request
//! moves past it.

use alloy::primitives::Address;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct NonceSlot {
    next: u64,
    committed_at: Option<Instant>,
}

/// Hands out exclusive nonce leases per (chain, account).
#[derive(Debug)]
pub struct NonceManager {
    slots: DashMap<(String, Address), Arc<Mutex<NonceSlot>>>,
    ttl: Duration,
}

impl NonceManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
        }
    }

    /// Wait for exclusive use of `account`'s nonce sequence on `chain_key`.
    pub async fn lease(&self, chain_key: &str, account: Address) -> NonceLease {
        let slot = self
            .slots
            .entry((chain_key.to_string(), account))
            .or_default()
            .clone();
        let guard = slot.lock_owned().await;

        NonceLease {
            guard,
            ttl: self.ttl,
            assigned: None,
        }
    }
}

/// Exclusive hold on one account's nonce sequence. Dropping it without
/// [`NonceLease::commit`] leaves the sequence untouched.
#[derive(Debug)]
pub struct NonceLease {
    guard: OwnedMutexGuard<NonceSlot>,
    ttl: Duration,
    assigned: Option<u64>,
}

impl NonceLease {
    /// Reconcile the chain's pending count with the locally committed nonce.
    pub fn assign(&mut self, chain_nonce: u64) -> u64 {
        let local = match self.guard.committed_at {
            Some(at) if at.elapsed() < self.ttl => self.guard.next,
            _ => 0,
        };
        let nonce = chain_nonce.max(local);
        self.assigned = Some(nonce);
        nonce
    }

    pub fn assigned(&self) -> Option<u64> {
        self.assigned
    }

    /// Record that the assigned nonce reached the relay.
    pub fn commit(mut self) {
        if let Some(nonce) = self.assigned {
            self.guard.next = nonce + 1;
            self.guard.committed_at = Some(Instant::now());
        }
    }
}
