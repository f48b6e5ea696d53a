//! Keystore error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during keystore operations
#[derive(Error, Debug)]
pub enum KeystoreError {
    /// MAC verification failed.
    ///
    /// A wrong password and a corrupted or tampered record are reported
    /// through this single variant.
    #[error("decryption failed: wrong password or corrupted keystore")]
    DecryptionFailed,

    /// Private key has the wrong length or cannot be decoded
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Caller-supplied IV is not 16 bytes
    #[error("invalid IV length: expected 16 bytes, got {0}")]
    InvalidIvLength(usize),

    /// PBKDF2 iteration count is below the security floor
    #[error("insufficient PBKDF2 iterations: minimum {minimum}, got {actual}")]
    InsufficientIterations { minimum: u32, actual: u32 },

    /// Record version is not 3
    #[error("unsupported keystore version: {0}")]
    UnsupportedVersion(u32),

    /// Unsupported KDF function
    #[error("unsupported KDF function: {0}")]
    UnsupportedKdf(String),

    /// Unsupported cipher function
    #[error("unsupported cipher function: {0}")]
    UnsupportedCipher(String),

    /// Invalid KDF parameters
    #[error("invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// Invalid cipher parameters
    #[error("invalid cipher parameters: {0}")]
    InvalidCipherParams(String),

    /// Key derivation failed
    #[error("key derivation failed: {0}")]
    KdfError(String),

    /// Builder was missing a required input
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid hex encoding
    #[error("invalid hex encoding: {0}")]
    HexError(String),

    /// Neither keystore layout exists for the identity
    #[error("keystore not found: tried {} and {}", flat.display(), nested.display())]
    NotFound { flat: PathBuf, nested: PathBuf },

    /// Keystore file already exists
    #[error("keystore already exists at path: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for keystore operations
pub type KeystoreResult<T> = Result<T, KeystoreError>;
