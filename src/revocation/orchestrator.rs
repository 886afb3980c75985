//! End-to-end sponsored revocation flow.
//!
//! ```text
//! resolve chain → validate addresses → lease nonce → build → sign
//!     → [sponsor funding tx] → bundle → submit → commit nonce
//! ```
//!
//! Each stage aborts the flow on failure; the error is wrapped with its
//! stage but otherwise passed through unchanged.

use alloy::primitives::B256;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::blockchain::address::validate_address;
use crate::blockchain::client::RpcSelector;
use crate::blockchain::registry::ChainRegistry;
use crate::blockchain::transaction::{ApprovalCall, BuildError, TransactionBuilder};
use crate::blockchain::types::BlockchainError;
use crate::blockchain::wallet::{sign_transaction, SignError, SignerKey, Wallet};
use crate::error::{Classify, ErrorKind, InputField, ValidationError};
use crate::observability::metrics;
use crate::relay::submitter::RelaySubmitter;
use crate::relay::tracker::{BundleStatusTracker, TrackerError};
use crate::relay::types::{Bundle, BundleError, BundleHandle, BundleStatus, RelayError};
use crate::revocation::cancel::{CancelToken, Cancelled};
use crate::revocation::nonce::NonceManager;

/// Caller input for one revocation. Addresses are raw strings until validated.
#[derive(Debug)]
pub struct RevocationRequest {
    pub token_address: String,
    pub spender_address: String,
    pub signer_address: String,
    pub signer_key: SignerKey,
    pub chain_key: String,
}

/// What a successful revocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationReceipt {
    pub handle: BundleHandle,
    /// Hash of the revocation transaction itself.
    pub tx_hash: B256,
    pub nonce: u64,
    pub target_block: u64,
    /// Whether a sponsor funding transfer preceded the revocation.
    pub sponsored: bool,
}

#[derive(Debug, Clone, Error)]
pub enum RevocationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Status(#[from] TrackerError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl RevocationError {
    /// Flow stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            RevocationError::Validation(_) => "validation",
            RevocationError::Chain(_) => "rpc",
            RevocationError::Build(_) => "build",
            RevocationError::Sign(_) => "sign",
            RevocationError::Bundle(_) => "bundle",
            RevocationError::Relay(_) => "submit",
            RevocationError::Status(_) => "status",
            RevocationError::Cancelled(_) => "cancelled",
        }
    }

    /// Offending input field, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            RevocationError::Validation(e) => e.field(),
            _ => None,
        }
    }
}

impl Classify for RevocationError {
    fn kind(&self) -> ErrorKind {
        match self {
            RevocationError::Validation(e) => e.kind(),
            RevocationError::Chain(e) => e.kind(),
            RevocationError::Build(e) => e.kind(),
            RevocationError::Sign(e) => e.kind(),
            RevocationError::Bundle(e) => e.kind(),
            RevocationError::Relay(e) => e.kind(),
            RevocationError::Status(e) => e.kind(),
            RevocationError::Cancelled(e) => e.kind(),
        }
    }
}

/// Composes registry, validation, building, signing and relay submission.
#[derive(Debug)]
pub struct SponsoredRevocationOrchestrator {
    registry: Arc<ChainRegistry>,
    rpcs: RpcSelector,
    builder: TransactionBuilder,
    submitter: RelaySubmitter,
    tracker: BundleStatusTracker,
    nonces: NonceManager,
    funder: Option<Arc<Wallet>>,
}

impl SponsoredRevocationOrchestrator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        rpcs: RpcSelector,
        builder: TransactionBuilder,
        submitter: RelaySubmitter,
        tracker: BundleStatusTracker,
        nonces: NonceManager,
    ) -> Self {
        Self {
            registry,
            rpcs,
            builder,
            submitter,
            tracker,
            nonces,
            funder: None,
        }
    }

    /// Prepend a transfer from `sponsor` covering the signer's gas to every bundle.
    pub fn with_funding_sponsor(mut self, sponsor: Arc<Wallet>) -> Self {
        self.funder = Some(sponsor);
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub async fn revoke(&self, request: RevocationRequest) -> Result<RevocationReceipt, RevocationError> {
        self.revoke_with_cancel(request, &CancelToken::detached()).await
    }

    /// Run the flow; `cancel` may stop it up to relay submission.
    pub async fn revoke_with_cancel(
        &self,
        request: RevocationRequest,
        cancel: &CancelToken,
    ) -> Result<RevocationReceipt, RevocationError> {
        let chain_label = self
            .registry
            .resolve(&request.chain_key)
            .map(|ctx| ctx.chain_key.clone())
            .unwrap_or_else(|_| "unsupported".to_string());
        let start = Instant::now();

        let result = self.run(request, cancel).await;

        match &result {
            Ok(receipt) => {
                cancel.mark_submitted(&receipt.handle.bundle_id);
                metrics::record_revocation(&chain_label, "submitted", start.elapsed());
            }
            Err(e) => {
                cancel.finish();
                metrics::record_revocation(&chain_label, &e.kind().to_string(), start.elapsed());
                tracing::warn!(
                    chain = %chain_label,
                    stage = e.stage(),
                    kind = %e.kind(),
                    error = %e,
                    "Revocation failed"
                );
            }
        }
        result
    }

    async fn run(
        &self,
        request: RevocationRequest,
        cancel: &CancelToken,
    ) -> Result<RevocationReceipt, RevocationError> {
        let RevocationRequest {
            token_address,
            spender_address,
            signer_address,
            signer_key,
            chain_key,
        } = request;

        let ctx = self.registry.resolve(&chain_key)?;
        let call = ApprovalCall {
            token: validate_address(InputField::Token, &token_address)?,
            spender: validate_address(InputField::Spender, &spender_address)?,
            signer: validate_address(InputField::Signer, &signer_address)?,
        };
        let rpc = self.rpcs.for_chain(&ctx)?;

        tracing::info!(
            chain = %ctx.chain_key,
            token = %call.token,
            spender = %call.spender,
            signer = %call.signer,
            "Revocation requested"
        );

        let mut signer_lease = cancel.guard(self.nonces.lease(&ctx.chain_key, call.signer)).await?;

        let stage_start = Instant::now();
        let utx = cancel
            .guard(self.builder.build(&ctx, rpc.as_ref(), &call, &mut signer_lease))
            .await??;
        metrics::record_stage("build", stage_start.elapsed());

        cancel.checkpoint()?;
        let revocation = sign_transaction(&utx, signer_key)?;

        let mut transactions = Vec::with_capacity(2);
        let mut sponsor_lease = None;
        if let Some(sponsor) = self.funder.as_ref().filter(|s| s.address() != call.signer) {
            // Always after the signer's lease, never before.
            let mut lease = cancel.guard(self.nonces.lease(&ctx.chain_key, sponsor.address())).await?;
            let funding = cancel
                .guard(self.builder.build_funding(&ctx, rpc.as_ref(), sponsor.address(), &utx, &mut lease))
                .await??;
            transactions.push(sponsor.sign(&funding)?);
            sponsor_lease = Some(lease);
        }
        let sponsored = sponsor_lease.is_some();
        transactions.push(revocation.clone());

        let head = cancel.guard(self.builder.head_block(rpc.as_ref())).await??;
        let target_block = head + 1;
        let bundle = Bundle::new(transactions, Some(target_block))?;

        cancel.begin_submission()?;
        let stage_start = Instant::now();
        let handle = self.submitter.submit(&bundle, &ctx).await?;
        metrics::record_stage("submit", stage_start.elapsed());

        signer_lease.commit();
        if let Some(lease) = sponsor_lease {
            lease.commit();
        }

        tracing::info!(
            chain = %ctx.chain_key,
            bundle_id = %handle.bundle_id,
            tx_hash = %revocation.tx_hash,
            nonce = utx.nonce,
            target_block,
            sponsored,
            "Revocation submitted"
        );

        Ok(RevocationReceipt {
            handle,
            tx_hash: revocation.tx_hash,
            nonce: utx.nonce,
            target_block,
            sponsored,
        })
    }

    /// Current status of a previously submitted bundle.
    pub async fn check_status(&self, handle: &BundleHandle) -> Result<BundleStatus, RevocationError> {
        let ctx = self.registry.resolve(&handle.chain_key)?;
        Ok(self.tracker.status(&ctx, handle).await?)
    }

    /// Like [`Self::check_status`], polling until terminal or `max_wait`.
    pub async fn wait_for_status(
        &self,
        handle: &BundleHandle,
        max_wait: Duration,
    ) -> Result<BundleStatus, RevocationError> {
        let ctx = self.registry.resolve(&handle.chain_key)?;
        Ok(self.tracker.wait_until_settled(&ctx, handle, max_wait).await?)
    }
}
