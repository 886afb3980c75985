//! Failure taxonomy shared by every stage of the revocation flow.
//!
//! Each module owns its own `thiserror` enum; all of them implement
//! [`Classify`] so the boundary can branch on [`ErrorKind`] without parsing
//! messages.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse failure classes surfaced to callers and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad caller input (address, chain key, hash). Never retried.
    Validation,
    /// Timeout or transport failure talking to the RPC node or relay.
    UpstreamTransient,
    /// The RPC node or relay explicitly refused the request.
    UpstreamRejected,
    /// Malformed or unusable private key material.
    Key,
    /// Invariant violation inside the service.
    Internal,
    /// The caller cancelled the flow before relay submission.
    Cancelled,
}

impl ErrorKind {
    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::UpstreamTransient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::UpstreamTransient => "upstream_transient",
            ErrorKind::UpstreamRejected => "upstream_rejected",
            ErrorKind::Key => "key",
            ErrorKind::Internal => "internal",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Maps a concrete error onto the taxonomy.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Input fields that carry addresses or hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputField {
    #[serde(rename = "token")]
    Token,
    #[serde(rename = "spender")]
    Spender,
    #[serde(rename = "signer")]
    Signer,
    #[serde(rename = "bundleHash")]
    BundleHash,
    #[serde(rename = "txHash")]
    TxHash,
}

impl InputField {
    pub fn as_str(self) -> &'static str {
        match self {
            InputField::Token => "token",
            InputField::Spender => "spender",
            InputField::Signer => "signer",
            InputField::BundleHash => "bundleHash",
            InputField::TxHash => "txHash",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address '{value}': {reason}")]
    InvalidAddress {
        field: InputField,
        value: String,
        reason: String,
    },

    #[error("invalid {field} '{value}': expected a 32-byte hex hash")]
    InvalidHash { field: InputField, value: String },

    #[error("unsupported chain '{0}'")]
    UnsupportedChain(String),
}

impl ValidationError {
    /// The offending input field, when the failure is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::InvalidAddress { field, .. }
            | ValidationError::InvalidHash { field, .. } => Some(field.as_str()),
            ValidationError::UnsupportedChain(_) => Some("chain"),
        }
    }
}

impl Classify for ValidationError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_field_names() {
        let err = ValidationError::InvalidAddress {
            field: InputField::Spender,
            value: "0x123".into(),
            reason: "too short".into(),
        };
        assert_eq!(err.field(), Some("spender"));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("spender"));

        let err = ValidationError::UnsupportedChain("solana-devnet".into());
        assert_eq!(err.field(), Some("chain"));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ErrorKind::UpstreamTransient.is_retryable());
        assert!(!ErrorKind::UpstreamRejected.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Key.is_retryable());
        assert!(!ErrorKind::Internal.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
    }
}
