//! Bundle types and relay error definitions.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::wallet::SignedTransaction;
use crate::error::{Classify, ErrorKind};

/// Errors talking to a private relay.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// JSON-RPC error object or a 4xx response. Terminal.
    #[error("relay rejected bundle (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Transport failure, 429 or 5xx.
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    #[error("relay timeout after {0:?}")]
    Timeout(Duration),

    #[error("malformed relay response: {0}")]
    MalformedResponse(String),

    #[error("bundle too large: {txs} transactions, {bytes} bytes")]
    TooLarge { txs: usize, bytes: usize },

    #[error("no relay configured for chain '{0}'")]
    NotConfigured(String),

    #[error("failed to sign relay request: {0}")]
    Auth(String),
}

impl Classify for RelayError {
    fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Rejected { .. } => ErrorKind::UpstreamRejected,
            RelayError::Unavailable(_) | RelayError::Timeout(_) | RelayError::MalformedResponse(_) => {
                ErrorKind::UpstreamTransient
            }
            RelayError::TooLarge { .. } | RelayError::NotConfigured(_) | RelayError::Auth(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("bundle must contain at least one transaction")]
    Empty,
}

impl Classify for BundleError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// Ordered, non-empty list of signed transactions submitted atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    transactions: Vec<SignedTransaction>,
    target_block: Option<u64>,
}

impl Bundle {
    pub fn new(
        transactions: Vec<SignedTransaction>,
        target_block: Option<u64>,
    ) -> Result<Self, BundleError> {
        if transactions.is_empty() {
            return Err(BundleError::Empty);
        }
        Ok(Self {
            transactions,
            target_block,
        })
    }

    pub fn transactions(&self) -> &[SignedTransaction] {
        &self.transactions
    }

    pub fn target_block(&self) -> Option<u64> {
        self.target_block
    }

    pub fn tx_hashes(&self) -> Vec<B256> {
        self.transactions.iter().map(|tx| tx.tx_hash).collect()
    }

    /// Sum of raw transaction sizes in bytes.
    pub fn encoded_size(&self) -> usize {
        self.transactions.iter().map(|tx| tx.raw_bytes.len()).sum()
    }
}

/// Reference to a bundle accepted by a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleHandle {
    pub bundle_id: String,
    pub chain_key: String,
    #[serde(default)]
    pub tx_hashes: Vec<B256>,
    #[serde(default)]
    pub target_block: Option<u64>,
}

/// Normalized bundle state, derived per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BundleStatus {
    Pending,
    Included {
        #[serde(rename = "blockNumber")]
        block_number: u64,
    },
    NotIncluded,
    Failed {
        reason: String,
    },
    Unknown,
}

impl BundleStatus {
    /// Whether polling again can change the answer.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BundleStatus::Included { .. } | BundleStatus::NotIncluded | BundleStatus::Failed { .. }
        )
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            BundleStatus::Pending => "pending",
            BundleStatus::Included { .. } => "included",
            BundleStatus::NotIncluded => "not_included",
            BundleStatus::Failed { .. } => "failed",
            BundleStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderTimestamp {
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Result of `flashbots_getBundleStatsV2`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayBundleStats {
    pub is_simulated: bool,
    pub is_high_priority: bool,
    pub simulated_at: Option<String>,
    pub received_at: Option<String>,
    pub considered_by_builders_at: Vec<BuilderTimestamp>,
    pub sealed_by_builders_at: Vec<BuilderTimestamp>,
    #[serde(alias = "simError")]
    pub simulation_error: Option<String>,
}
