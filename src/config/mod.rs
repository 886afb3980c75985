//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → RevokerConfig (validated, immutable)
//!     → ChainRegistry / clients built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Secrets come from the environment only and are never serialized

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ChainConfig, GasConfig, ListenerConfig, LogFormat, NonceConfig, ObservabilityConfig,
    RelayConfig, RetryConfig, RevokerConfig, SponsorConfig, SponsorMode, StatusConfig,
    TimeoutConfig,
};
