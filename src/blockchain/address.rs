//! Address and hash validation for caller input.
//!
//! Accepts `0x`-prefixed or bare hex. Mixed-case input must carry a valid
//! EIP-55 checksum; all-lowercase and all-uppercase input is accepted as-is.
//! The returned [`Address`] displays in canonical checksummed form, so
//! validating an already validated address yields the same value.

use alloy::primitives::{Address, B256};
use std::str::FromStr;

use crate::error::{InputField, ValidationError};

/// Values longer than this are truncated in error messages so a key pasted
/// into the wrong field is not echoed back.
const MAX_ECHO_LEN: usize = 42;

fn echo(raw: &str) -> String {
    if raw.chars().count() <= MAX_ECHO_LEN {
        raw.to_string()
    } else {
        let head: String = raw.chars().take(10).collect();
        format!("{head}…")
    }
}

fn strip_hex_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}

/// Validate and canonicalize an account or contract address.
pub fn validate_address(field: InputField, raw: &str) -> Result<Address, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidAddress {
        field,
        value: echo(raw),
        reason,
    };

    let body = strip_hex_prefix(raw.trim());
    if body.len() != 40 {
        return Err(invalid(format!(
            "expected 20 bytes (40 hex characters), got {} characters",
            body.len()
        )));
    }
    if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid("not valid hex".to_string()));
    }

    let address = Address::from_str(body).map_err(|e| invalid(e.to_string()))?;

    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        let expected = address.to_checksum(None);
        if expected[2..] != *body {
            return Err(invalid(format!("checksum mismatch, expected {expected}")));
        }
    }

    if address.is_zero() {
        return Err(invalid("zero address not allowed".to_string()));
    }

    Ok(address)
}

/// Validate a 32-byte hash (bundle id or transaction hash).
pub fn validate_hash(field: InputField, raw: &str) -> Result<B256, ValidationError> {
    let body = strip_hex_prefix(raw.trim());
    if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidHash {
            field,
            value: echo(raw),
        });
    }
    B256::from_str(body).map_err(|_| ValidationError::InvalidHash {
        field,
        value: echo(raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // EIP-55 test vectors.
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_validate_is_idempotent() {
        for raw in CHECKSUMMED {
            let first = validate_address(InputField::Token, raw).unwrap();
            assert_eq!(first.to_string(), *raw);
            let second = validate_address(InputField::Token, &first.to_string()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_single_case_accepted() {
        let lower = CHECKSUMMED[0].to_lowercase();
        let upper = format!("0x{}", CHECKSUMMED[0][2..].to_uppercase());
        let expected = validate_address(InputField::Signer, CHECKSUMMED[0]).unwrap();
        assert_eq!(validate_address(InputField::Signer, &lower).unwrap(), expected);
        assert_eq!(validate_address(InputField::Signer, &upper).unwrap(), expected);
        // Bare hex without prefix.
        assert_eq!(validate_address(InputField::Signer, &lower[2..]).unwrap(), expected);
    }

    #[test]
    fn test_too_short_names_field() {
        let err = validate_address(InputField::Spender, "0x123").unwrap_err();
        assert_eq!(err.field(), Some("spender"));
        assert!(matches!(err, ValidationError::InvalidAddress { ref reason, .. } if reason.contains("got 3")));
    }

    #[test]
    fn test_invalid_hex() {
        let err = validate_address(InputField::Token, "0xZZZZb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap_err();
        assert_eq!(err.field(), Some("token"));
        assert!(err.to_string().contains("not valid hex"));
    }

    #[test]
    fn test_bad_checksum() {
        // Flip the case of one letter.
        let bad = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD";
        let err = validate_address(InputField::Signer, bad).unwrap_err();
        assert_eq!(err.field(), Some("signer"));
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_zero_address_rejected() {
        let err = validate_address(InputField::Token, "0x0000000000000000000000000000000000000000")
            .unwrap_err();
        assert!(err.to_string().contains("zero address"));
    }

    #[test]
    fn test_long_values_not_echoed() {
        let key_like = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let err = validate_address(InputField::Spender, key_like).unwrap_err();
        assert!(!err.to_string().contains("cbed5efcae784d7bf4f2ff80"));
    }

    #[test]
    fn test_validate_hash() {
        let raw = format!("0x{}", "ab".repeat(32));
        assert_eq!(validate_hash(InputField::BundleHash, &raw).unwrap(), B256::repeat_byte(0xab));
        let err = validate_hash(InputField::BundleHash, "0x1234").unwrap_err();
        assert_eq!(err.field(), Some("bundleHash"));
    }
}
