//! Sponsored revocation flow.
//!
//! # Data Flow
//! ```text
//! RevocationRequest
//!     → orchestrator.rs (stage composition, metrics)
//!     → nonce.rs (per-account lease across build → submit)
//!     → cancel.rs (cooperative cancellation up to submission)
//!     → RevocationReceipt { BundleHandle, tx hash, nonce }
//! ```

pub mod cancel;
pub mod nonce;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancel::{cancel_pair, CancelHandle, CancelOutcome, CancelToken, Cancelled};
pub use nonce::{NonceLease, NonceManager};
pub use orchestrator::{
    RevocationError, RevocationReceipt, RevocationRequest, SponsoredRevocationOrchestrator,
};
