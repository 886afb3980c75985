//! Unsigned transaction construction.
//!
//! # Responsibilities
//! - Encode `approve(spender, 0)` call data
//! - Fetch the pending nonce and reconcile it with the local lease
//! - Price gas from `eth_gasPrice` with the configured multiplier and ceiling
//! - Bind the chain id for EIP-155 replay protection

use alloy::consensus::TxLegacy;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use thiserror::Error;

use crate::blockchain::client::ChainRpc;
use crate::blockchain::registry::ChainContext;
use crate::blockchain::types::BlockchainError;
use crate::config::GasConfig;
use crate::error::{Classify, ErrorKind};
use crate::resilience::RetryPolicy;
use crate::revocation::nonce::NonceLease;

sol! {
    function approve(address spender, uint256 amount) external returns (bool);
}

/// Gas for a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// ABI call data for `approve(spender, 0)`.
pub fn encode_revocation(spender: Address) -> Bytes {
    approveCall {
        spender,
        amount: U256::ZERO,
    }
    .abi_encode()
    .into()
}

/// Decode `approve` call data back into `(spender, amount)`.
pub fn decode_approval(data: &[u8]) -> Option<(Address, U256)> {
    approveCall::abi_decode(data)
        .ok()
        .map(|call| (call.spender, call.amount))
}

/// Validated addresses for one revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalCall {
    pub token: Address,
    pub spender: Address,
    pub signer: Address,
}

/// Fully specified legacy transaction awaiting a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

impl UnsignedTransaction {
    pub fn to_legacy(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(self.to),
            value: self.value,
            input: self.data.clone(),
        }
    }

    /// Upper bound on what this transaction can cost in wei.
    pub fn max_fee(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.gas_price)
    }
}

/// Failures while assembling an unsigned transaction.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("failed to fetch nonce: {0}")]
    NonceFetch(BlockchainError),

    #[error("failed to fetch gas price: {0}")]
    GasPriceFetch(BlockchainError),

    #[error("gas price {current_gwei} gwei exceeds ceiling of {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u128, max_gwei: u64 },

    #[error("gas estimation failed: {reason}")]
    GasEstimation { reason: String },

    #[error("gas estimation unavailable: {0}")]
    GasEstimationUnavailable(BlockchainError),

    #[error("failed to fetch head block: {0}")]
    HeadFetch(BlockchainError),
}

impl Classify for BuildError {
    fn kind(&self) -> ErrorKind {
        match self {
            BuildError::NonceFetch(e)
            | BuildError::GasPriceFetch(e)
            | BuildError::GasEstimationUnavailable(e)
            | BuildError::HeadFetch(e) => e.kind(),
            BuildError::GasPriceTooHigh { .. } => ErrorKind::UpstreamTransient,
            BuildError::GasEstimation { .. } => ErrorKind::UpstreamRejected,
        }
    }
}

/// Builds revocation and funding transactions against a chain's RPC.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    gas: GasConfig,
    retry: RetryPolicy,
}

impl TransactionBuilder {
    pub fn new(gas: GasConfig, retry: RetryPolicy) -> Self {
        Self { gas, retry }
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas.approve_gas_limit
    }

    /// Build `approve(spender, 0)` on `call.token`, sent by `call.signer`.
    pub async fn build(
        &self,
        ctx: &ChainContext,
        rpc: &dyn ChainRpc,
        call: &ApprovalCall,
        lease: &mut NonceLease,
    ) -> Result<UnsignedTransaction, BuildError> {
        let chain_nonce = self
            .retry
            .run("eth_getTransactionCount", || rpc.transaction_count(call.signer))
            .await
            .map_err(BuildError::NonceFetch)?;
        let nonce = lease.assign(chain_nonce);

        let gas_price = self.gas_price(rpc).await?;
        let data = encode_revocation(call.spender);
        let gas_limit = self.gas.approve_gas_limit;

        if self.gas.estimate {
            self.check_estimate(rpc, call, &data, gas_limit).await?;
        }

        tracing::debug!(
            chain = %ctx.chain_key,
            token = %call.token,
            nonce,
            chain_nonce,
            gas_price,
            gas_limit,
            "Built revocation transaction"
        );

        Ok(UnsignedTransaction {
            from: call.signer,
            to: call.token,
            value: U256::ZERO,
            data,
            nonce,
            gas_limit,
            gas_price,
            chain_id: ctx.chain_id,
        })
    }

    /// Build a sponsor → signer transfer covering `revocation`'s maximum fee.
    pub async fn build_funding(
        &self,
        ctx: &ChainContext,
        rpc: &dyn ChainRpc,
        sponsor: Address,
        revocation: &UnsignedTransaction,
        lease: &mut NonceLease,
    ) -> Result<UnsignedTransaction, BuildError> {
        let chain_nonce = self
            .retry
            .run("eth_getTransactionCount", || rpc.transaction_count(sponsor))
            .await
            .map_err(BuildError::NonceFetch)?;
        let nonce = lease.assign(chain_nonce);

        Ok(UnsignedTransaction {
            from: sponsor,
            to: revocation.from,
            value: revocation.max_fee(),
            data: Bytes::new(),
            nonce,
            gas_limit: TRANSFER_GAS_LIMIT,
            gas_price: revocation.gas_price,
            chain_id: ctx.chain_id,
        })
    }

    /// Current gas price with multiplier applied, bounded by the ceiling.
    pub async fn gas_price(&self, rpc: &dyn ChainRpc) -> Result<u128, BuildError> {
        let base = self
            .retry
            .run("eth_gasPrice", || rpc.gas_price())
            .await
            .map_err(BuildError::GasPriceFetch)?;

        let adjusted = apply_multiplier(base, self.gas.price_multiplier);
        let ceiling = u128::from(self.gas.max_gas_price_gwei).saturating_mul(WEI_PER_GWEI);
        if adjusted > ceiling {
            return Err(BuildError::GasPriceTooHigh {
                current_gwei: adjusted / WEI_PER_GWEI,
                max_gwei: self.gas.max_gas_price_gwei,
            });
        }
        Ok(adjusted)
    }

    /// Latest block number, used to target the next block.
    pub async fn head_block(&self, rpc: &dyn ChainRpc) -> Result<u64, BuildError> {
        self.retry
            .run("eth_blockNumber", || rpc.block_number())
            .await
            .map_err(BuildError::HeadFetch)
    }

    async fn check_estimate(
        &self,
        rpc: &dyn ChainRpc,
        call: &ApprovalCall,
        data: &Bytes,
        gas_limit: u64,
    ) -> Result<(), BuildError> {
        let estimate = self
            .retry
            .run("eth_estimateGas", || {
                rpc.estimate_gas(call.signer, call.token, data.clone())
            })
            .await;

        match estimate {
            Ok(gas) if gas > gas_limit => Err(BuildError::GasEstimation {
                reason: format!("estimated {gas} gas exceeds limit of {gas_limit}"),
            }),
            Ok(_) => Ok(()),
            Err(BlockchainError::Rejected { message, .. }) => {
                Err(BuildError::GasEstimation { reason: message })
            }
            Err(e) => Err(BuildError::GasEstimationUnavailable(e)),
        }
    }
}

/// Scale `price` by `multiplier` using basis points to stay in integers.
fn apply_multiplier(price: u128, multiplier: f64) -> u128 {
    let bps = (multiplier * 10_000.0).round().max(0.0) as u128;
    price.saturating_mul(bps) / 10_000
}
