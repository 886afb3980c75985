//! Private relay subsystem.
//!
//! # Data Flow
//! ```text
//! Signed transactions
//!     → types.rs (Bundle: non-empty, ordered, target block)
//!     → submitter.rs (size limits, retry on unavailability)
//!     → client.rs (eth_sendBundle with X-Flashbots-Signature)
//!     → BundleHandle
//! BundleHandle
//!     → tracker.rs (flashbots_getBundleStatsV2, on-chain fallback)
//!     → BundleStatus
//! ```

pub mod client;
pub mod submitter;
pub mod tracker;
pub mod types;

pub use client::{BundleRelay, FlashbotsRelay, RelaySelector};
pub use submitter::RelaySubmitter;
pub use tracker::{BundleStatusTracker, TrackerError};
pub use types::{Bundle, BundleError, BundleHandle, BundleStatus, RelayBundleStats, RelayError};
