//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call (RPC node or relay):
//!     → deadline enforced by the client (tokio::time::timeout)
//!     → On failure: retries.rs (retry only transient kinds, exponential
//!       backoff with jitter)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; a missed deadline is transient
//! - Rejections are never retried
//! - Retries are bounded; exhaustion surfaces the last error unchanged

pub mod retries;

pub use retries::RetryPolicy;
