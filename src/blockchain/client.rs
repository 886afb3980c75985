//! Per-chain JSON-RPC client with deadlines and failover.
//!
//! # Responsibilities
//! - Connect to the primary and failover JSON-RPC endpoints of one chain
//! - Query the chain state the revocation flow needs
//! - Classify failures: node rejections vs. transport errors and timeouts
//! - Select the client for a resolved chain

use alloy::network::TransactionBuilder as _;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::registry::{ChainContext, ChainRegistry};
use crate::blockchain::types::{BlockchainError, BlockchainResult, TransactionLookup};

/// Chain queries used by the revocation flow.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn chain_id(&self) -> BlockchainResult<u64>;

    async fn block_number(&self) -> BlockchainResult<u64>;

    /// Transaction count including pending transactions.
    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64>;

    async fn gas_price(&self) -> BlockchainResult<u128>;

    async fn estimate_gas(&self, from: Address, to: Address, data: Bytes) -> BlockchainResult<u64>;

    /// `None` when the node has never seen the hash.
    async fn transaction_by_hash(&self, hash: B256) -> BlockchainResult<Option<TransactionLookup>>;
}

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    chain_key: String,
    chain_id: u64,
    /// Primary first, then failovers.
    providers: Vec<DynProvider>,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Build a client for `ctx` without touching the network.
    pub fn connect(ctx: &ChainContext, timeout_duration: Duration) -> Self {
        let providers = std::iter::once(&ctx.rpc_endpoint)
            .chain(ctx.failover_endpoints.iter())
            .map(|url| ProviderBuilder::new().connect_http(url.clone()).erased())
            .collect();

        Self {
            chain_key: ctx.chain_key.clone(),
            chain_id: ctx.chain_id,
            providers,
            timeout_duration,
        }
    }

    /// Build a client and verify the node serves the configured chain.
    ///
    /// Verification failures are logged, not returned, so the service can
    /// start while a node is down.
    pub async fn new(ctx: &ChainContext, timeout_duration: Duration) -> Self {
        let client = Self::connect(ctx, timeout_duration);

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    chain = %ctx.chain_key,
                    chain_id = ctx.chain_id,
                    endpoints = client.providers.len(),
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    chain = %ctx.chain_key,
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        client
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let actual = self.chain_id().await?;
        if actual != self.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Try each provider in order. A node-level rejection is returned
    /// immediately; transport errors and timeouts fall through to the next.
    async fn call<T, F, Fut>(&self, method: &'static str, f: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = BlockchainError::Rpc(format!("no RPC providers for {}", self.chain_key));

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    return Err(BlockchainError::Rejected {
                        method,
                        code: payload.code,
                        message: payload.message.to_string(),
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(chain = %self.chain_key, method, provider_idx = i, error = %e, "RPC error, trying next provider");
                    last_error = BlockchainError::Rpc(format!("{method}: {e}"));
                }
                Err(_) => {
                    tracing::warn!(chain = %self.chain_key, method, provider_idx = i, "RPC timeout, trying next provider");
                    last_error = BlockchainError::Timeout(self.timeout_duration);
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl ChainRpc for BlockchainClient {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.call("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.call("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.call("eth_getTransactionCount", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.call("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn estimate_gas(&self, from: Address, to: Address, data: Bytes) -> BlockchainResult<u64> {
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(data);
        self.call("eth_estimateGas", |p| {
            let request = request.clone();
            async move { p.estimate_gas(request).await }
        })
        .await
    }

    async fn transaction_by_hash(&self, hash: B256) -> BlockchainResult<Option<TransactionLookup>> {
        let tx = self
            .call("eth_getTransactionByHash", |p| async move {
                p.get_transaction_by_hash(hash).await
            })
            .await?;

        Ok(tx.map(|tx| match tx.block_number {
            Some(block_number) => TransactionLookup::Mined { block_number },
            None => TransactionLookup::Pending,
        }))
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("chain", &self.chain_key)
            .field("chain_id", &self.chain_id)
            .field("endpoints", &self.providers.len())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}

/// Chain key → RPC client.
#[derive(Clone, Default)]
pub struct RpcSelector {
    clients: HashMap<String, Arc<dyn ChainRpc>>,
}

impl RpcSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// One verified client per registered chain.
    pub async fn connect(registry: &ChainRegistry, timeout_duration: Duration) -> Self {
        let mut selector = Self::new();
        for ctx in registry.chains() {
            let client = BlockchainClient::new(&ctx, timeout_duration).await;
            selector.insert(&ctx.chain_key, Arc::new(client));
        }
        selector
    }

    pub fn insert(&mut self, chain_key: &str, client: Arc<dyn ChainRpc>) {
        self.clients.insert(chain_key.to_string(), client);
    }

    pub fn for_chain(&self, ctx: &ChainContext) -> BlockchainResult<Arc<dyn ChainRpc>> {
        self.clients
            .get(&ctx.chain_key)
            .cloned()
            .ok_or_else(|| BlockchainError::NotAvailable(ctx.chain_key.clone()))
    }
}

impl std::fmt::Debug for RpcSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chains: Vec<_> = self.clients.keys().collect();
        chains.sort();
        f.debug_struct("RpcSelector").field("chains", &chains).finish()
    }
}
