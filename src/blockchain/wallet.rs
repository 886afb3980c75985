//! Key handling and transaction signing.
//!
//! # Security
//! - Caller keys arrive as [`SignerKey`], which zeroizes on drop and never
//!   prints or serializes its contents
//! - [`sign_transaction`] takes the key by value; it is dropped when the
//!   call returns
//! - Error messages describe the key's shape, never its bytes

use alloy::consensus::{SignableTransaction, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::hex;
use alloy::network::TxSignerSync;
use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::blockchain::transaction::UnsignedTransaction;
use crate::error::{Classify, ErrorKind};

/// Errors raised while turning a key into a signature.
#[derive(Debug, Clone, Error)]
pub enum SignError {
    #[error("invalid private key: {0}")]
    InvalidKey(&'static str),

    #[error("private key does not control {expected}")]
    SignerMismatch { expected: Address },

    #[error("signing failed: {0}")]
    Signing(String),
}

impl Classify for SignError {
    fn kind(&self) -> ErrorKind {
        match self {
            SignError::InvalidKey(_) | SignError::SignerMismatch { .. } => ErrorKind::Key,
            SignError::Signing(_) => ErrorKind::Internal,
        }
    }
}

/// Hex-encoded secp256k1 private key supplied by a caller or the environment.
///
/// Not `Clone`: one owned buffer per key, wiped on drop.
///
/// ```compile_fail
/// use approval_revoker::blockchain::SignerKey;
///
/// let key = SignerKey::new("0x01");
/// let _copy = key.clone();
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SignerKey(String);

impl SignerKey {
    pub fn new(hex_key: impl Into<String>) -> Self {
        Self(hex_key.into())
    }

    /// Decode into raw scalar bytes. The buffer is wiped when dropped.
    fn decode(&self) -> Result<Zeroizing<Vec<u8>>, SignError> {
        let trimmed = self.0.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if body.len() != 64 {
            return Err(SignError::InvalidKey("expected 32 bytes (64 hex characters)"));
        }
        hex::decode(body)
            .map(Zeroizing::new)
            .map_err(|_| SignError::InvalidKey("not valid hex"))
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignerKey(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for SignerKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SignerKey)
    }
}

/// Signed, EIP-2718 encoded transaction ready for a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw_bytes: Bytes,
    pub tx_hash: B256,
    pub nonce: u64,
    pub from: Address,
}

/// A loaded signing key.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    pub fn from_key(key: &SignerKey) -> Result<Self, SignError> {
        let bytes = key.decode()?;
        let signer = PrivateKeySigner::from_slice(&bytes)
            .map_err(|_| SignError::InvalidKey("not a valid secp256k1 scalar"))?;
        Ok(Self { signer })
    }

    /// Fresh throwaway key, used as relay identity when no sponsor is configured.
    pub fn random() -> Self {
        loop {
            let bytes = Zeroizing::new(rand::random::<[u8; 32]>());
            if let Ok(signer) = PrivateKeySigner::from_slice(bytes.as_ref()) {
                return Self { signer };
            }
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a legacy EIP-155 transaction. The key must control `utx.from`.
    pub fn sign(&self, utx: &UnsignedTransaction) -> Result<SignedTransaction, SignError> {
        if self.address() != utx.from {
            return Err(SignError::SignerMismatch { expected: utx.from });
        }

        let mut tx = utx.to_legacy();
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| SignError::Signing(e.to_string()))?;
        let signed = tx.into_signed(signature);
        let tx_hash = *signed.hash();
        let raw_bytes = Bytes::from(TxEnvelope::from(signed).encoded_2718());

        Ok(SignedTransaction {
            raw_bytes,
            tx_hash,
            nonce: utx.nonce,
            from: utx.from,
        })
    }

    /// Value for the `X-Flashbots-Signature` header: `<address>:<sig>` where
    /// `sig` is an EIP-191 signature over the hex keccak256 of `body`.
    pub fn sign_request_body(&self, body: &[u8]) -> Result<String, SignError> {
        let digest = hex::encode_prefixed(keccak256(body));
        let signature = self
            .signer
            .sign_message_sync(digest.as_bytes())
            .map_err(|e| SignError::Signing(e.to_string()))?;
        Ok(format!(
            "{}:{}",
            self.address(),
            hex::encode_prefixed(signature.as_bytes())
        ))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address()).finish()
    }
}

/// Sign `utx` with a caller key. The key is consumed and wiped on return.
pub fn sign_transaction(
    utx: &UnsignedTransaction,
    key: SignerKey,
) -> Result<SignedTransaction, SignError> {
    let wallet = Wallet::from_key(&key)?;
    drop(key);
    wallet.sign(utx)
}
