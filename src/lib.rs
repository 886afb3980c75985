//! Sponsored ERC-20 approval revocation service.
//!
//! Builds `approve(spender, 0)` transactions, signs them with the caller's
//! key and ships them to a private relay as bundles, so the revocation never
//! sits in the public mempool.

pub mod blockchain;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod revocation;

pub use config::schema::RevokerConfig;
pub use error::{Classify, ErrorKind};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use revocation::{RevocationError, RevocationReceipt, RevocationRequest, SponsoredRevocationOrchestrator};
