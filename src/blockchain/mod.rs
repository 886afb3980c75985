//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! RevokerConfig.chains
//!     → registry.rs (chain key → ChainContext)
//!     → client.rs (RPC connection with timeouts and failover)
//! Caller input
//!     → address.rs (EIP-55 validation)
//!     → transaction.rs (nonce, gas, approve(spender, 0))
//!     → wallet.rs (EIP-155 signing, relay request signatures)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable

pub mod address;
pub mod client;
pub mod registry;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use address::{validate_address, validate_hash};
pub use client::{BlockchainClient, ChainRpc, RpcSelector};
pub use registry::{ChainContext, ChainRegistry};
pub use transaction::{ApprovalCall, BuildError, TransactionBuilder, UnsignedTransaction};
pub use types::{BlockchainError, TransactionLookup};
pub use wallet::{sign_transaction, SignError, SignedTransaction, SignerKey, Wallet};
