//! Cryptographic error types

use thiserror::Error;

/// Key and signature encoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid secret key bytes
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// Invalid public key bytes or text
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid signature bytes or text
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Base58 checksum did not match
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Signing operation failed
    #[error("signing failed: {0}")]
    SigningFailed(String),
}
