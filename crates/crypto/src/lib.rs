//! Key material for valforge
//!
//! This crate provides:
//! - The version 3 password-encrypted keystore and its on-disk store
//! - Secp256k1 keys and signatures in Antelope text encodings
//! - Zeroizing wrappers for passwords and key bytes

pub mod antelope;
pub mod error;
pub mod keystore;
pub mod secure;

pub use antelope::{AntelopePrivateKey, AntelopePublicKey, AntelopeSignature};

pub use error::CryptoError;

pub use secure::{IntoSecret, SecretBytes, SecretString};

// Re-export for callers reading secret wrappers
pub use secrecy::ExposeSecret;

pub use keystore::{
    DecryptedKey, KdfChoice, Keystore, KeystoreBuilder, KeystoreError, KeystoreResult,
    KeystoreStore,
};
