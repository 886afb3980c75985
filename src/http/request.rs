//! Request bodies accepted by the HTTP API.
//!
//! Addresses and hashes stay raw strings here; the revocation flow validates
//! them so failures carry the offending field name.

use serde::Deserialize;

use crate::blockchain::wallet::SignerKey;
use crate::revocation::RevocationRequest;

/// Header clients use to name a request so it can be cancelled later.
pub const X_REQUEST_ID: &str = "x-request-id";

pub const DEFAULT_CHAIN: &str = "ethereum";

fn default_chain() -> String {
    DEFAULT_CHAIN.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredTxRequest {
    pub token_address: String,
    pub spender_address: String,
    pub signer_address: String,
    pub signer_private_key: SignerKey,
    #[serde(default = "default_chain")]
    pub chain: String,
}

impl From<SponsoredTxRequest> for RevocationRequest {
    fn from(req: SponsoredTxRequest) -> Self {
        RevocationRequest {
            token_address: req.token_address,
            spender_address: req.spender_address,
            signer_address: req.signer_address,
            signer_key: req.signer_private_key,
            chain_key: req.chain,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStatusRequest {
    pub bundle_hash: String,
    #[serde(default = "default_chain")]
    pub chain: String,
    /// Revocation tx hash; lets the chain answer when the relay cannot.
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub target_block: Option<u64>,
    /// Poll until a terminal status or this many seconds pass.
    #[serde(default)]
    pub wait_secs: Option<u64>,
}
