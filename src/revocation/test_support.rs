//! In-memory chain and relay doubles for unit tests.

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::blockchain::client::{ChainRpc, RpcSelector};
use crate::blockchain::registry::{ChainContext, ChainRegistry};
use crate::blockchain::transaction::TransactionBuilder;
use crate::blockchain::types::{BlockchainError, BlockchainResult, TransactionLookup};
use crate::config::{GasConfig, StatusConfig};
use crate::relay::client::{BundleRelay, RelaySelector};
use crate::relay::submitter::RelaySubmitter;
use crate::relay::tracker::BundleStatusTracker;
use crate::relay::types::{Bundle, RelayBundleStats, RelayError};
use crate::resilience::RetryPolicy;
use crate::revocation::nonce::NonceManager;
use crate::revocation::orchestrator::SponsoredRevocationOrchestrator;

pub fn test_context(chain_key: &str, chain_id: u64) -> ChainContext {
    ChainContext {
        chain_key: chain_key.to_string(),
        rpc_endpoint: Url::parse("http://127.0.0.1:8545").unwrap(),
        failover_endpoints: Vec::new(),
        chain_id,
        relay_endpoint: Url::parse("http://127.0.0.1:18545").unwrap(),
        relay_tracking_blocks: 25,
    }
}

/// Orchestrator wired to one "ethereum" (chain id 1) mock node and relay,
/// with millisecond retry delays.
pub fn test_orchestrator(rpc: Arc<MockRpc>, relay: Arc<MockRelay>) -> SponsoredRevocationOrchestrator {
    let registry = Arc::new(ChainRegistry::new([test_context("ethereum", 1)]));
    let mut rpcs = RpcSelector::new();
    rpcs.insert("ethereum", rpc);
    let mut relays = RelaySelector::new();
    relays.insert("ethereum", relay);
    let retry = RetryPolicy::new(3, 1, 2);

    SponsoredRevocationOrchestrator::new(
        registry,
        rpcs.clone(),
        TransactionBuilder::new(GasConfig::default(), retry),
        RelaySubmitter::new(relays.clone(), retry),
        BundleStatusTracker::new(relays, rpcs, &StatusConfig::default()),
        NonceManager::new(Duration::from_secs(60)),
    )
}

/// Scripted node. Failing methods time out.
#[derive(Debug, Default)]
pub struct MockRpc {
    chain_id: u64,
    nonces: HashMap<Address, u64>,
    gas_price: u128,
    estimate: u64,
    head: u64,
    mined: HashMap<B256, u64>,
    failing: HashSet<&'static str>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<&'static str, u32>>,
}

impl MockRpc {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas_price: 1_000_000_000,
            estimate: 46_000,
            head: 100,
            ..Default::default()
        }
    }

    pub fn with_nonce(mut self, address: Address, nonce: u64) -> Self {
        self.nonces.insert(address, nonce);
        self
    }

    pub fn with_gas_price(mut self, wei: u128) -> Self {
        self.gas_price = wei;
        self
    }

    pub fn with_estimate(mut self, gas: u64) -> Self {
        self.estimate = gas;
        self
    }

    pub fn with_head(mut self, block: u64) -> Self {
        self.head = block;
        self
    }

    pub fn with_mined(mut self, hash: B256, block: u64) -> Self {
        self.mined.insert(hash, block);
        self
    }

    pub fn failing(mut self, method: &'static str) -> Self {
        self.failing.insert(method);
        self
    }

    /// Every call sleeps this long first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, method: &str) -> u32 {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    async fn enter(&self, method: &'static str) -> BlockchainResult<()> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(method) {
            return Err(BlockchainError::Timeout(Duration::from_millis(1)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.enter("eth_chainId").await?;
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.enter("eth_blockNumber").await?;
        Ok(self.head)
    }

    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.enter("eth_getTransactionCount").await?;
        Ok(self.nonces.get(&address).copied().unwrap_or(0))
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.enter("eth_gasPrice").await?;
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _from: Address, _to: Address, _data: Bytes) -> BlockchainResult<u64> {
        self.enter("eth_estimateGas").await?;
        Ok(self.estimate)
    }

    async fn transaction_by_hash(&self, hash: B256) -> BlockchainResult<Option<TransactionLookup>> {
        self.enter("eth_getTransactionByHash").await?;
        Ok(self
            .mined
            .get(&hash)
            .map(|&block_number| TransactionLookup::Mined { block_number }))
    }
}

#[derive(Debug, Clone)]
enum RelayMode {
    Accept(String),
    Reject(i64, String),
    Unavailable,
}

/// Scripted relay that records every submitted bundle.
#[derive(Debug)]
pub struct MockRelay {
    mode: RelayMode,
    stats: Option<RelayBundleStats>,
    delay: Option<Duration>,
    submissions: AtomicU32,
    bundles: Mutex<Vec<Bundle>>,
}

impl MockRelay {
    fn with_mode(mode: RelayMode) -> Self {
        Self {
            mode,
            stats: None,
            delay: None,
            submissions: AtomicU32::new(0),
            bundles: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting(bundle_id: &str) -> Self {
        Self::with_mode(RelayMode::Accept(bundle_id.to_string()))
    }

    pub fn rejecting(code: i64, message: &str) -> Self {
        Self::with_mode(RelayMode::Reject(code, message.to_string()))
    }

    pub fn unavailable() -> Self {
        Self::with_mode(RelayMode::Unavailable)
    }

    /// Make the relay report `stats` for every bundle.
    pub fn with_stats(mut self, stats: RelayBundleStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Hold every submission for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn bundles(&self) -> Vec<Bundle> {
        self.bundles.lock().unwrap().clone()
    }
}

#[async_trait]
impl BundleRelay for MockRelay {
    async fn send_bundle(&self, bundle: &Bundle) -> Result<String, RelayError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.mode {
            RelayMode::Accept(id) => {
                self.bundles.lock().unwrap().push(bundle.clone());
                Ok(id.clone())
            }
            RelayMode::Reject(code, message) => Err(RelayError::Rejected {
                code: *code,
                message: message.clone(),
            }),
            RelayMode::Unavailable => Err(RelayError::Unavailable("HTTP 503".into())),
        }
    }

    async fn bundle_status(
        &self,
        _bundle_id: &str,
        _target_block: Option<u64>,
    ) -> Result<Option<RelayBundleStats>, RelayError> {
        match self.mode {
            RelayMode::Unavailable => Err(RelayError::Unavailable("HTTP 503".into())),
            _ => Ok(self.stats.clone()),
        }
    }
}
