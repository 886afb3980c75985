//! Chain-specific types and error definitions.

use std::time::Duration;
use thiserror::Error;

use crate::error::{Classify, ErrorKind};

/// Errors that can occur during JSON-RPC operations.
#[derive(Debug, Clone, Error)]
pub enum BlockchainError {
    /// RPC transport failed on every configured endpoint.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request exceeded its deadline.
    #[error("RPC timeout after {0:?}")]
    Timeout(Duration),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC rejected {method} (code {code}): {message}")]
    Rejected {
        method: &'static str,
        code: i64,
        message: String,
    },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// No client was wired for a chain the registry knows.
    #[error("Blockchain not available: {0}")]
    NotAvailable(String),
}

impl Classify for BlockchainError {
    fn kind(&self) -> ErrorKind {
        match self {
            BlockchainError::Rpc(_) | BlockchainError::Timeout(_) => ErrorKind::UpstreamTransient,
            BlockchainError::Rejected { .. } => ErrorKind::UpstreamRejected,
            BlockchainError::ChainMismatch { .. } | BlockchainError::NotAvailable(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// What `eth_getTransactionByHash` reported for a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionLookup {
    /// Mined in the given block.
    Mined { block_number: u64 },
    /// Known to the node but not yet in a block.
    Pending,
}
