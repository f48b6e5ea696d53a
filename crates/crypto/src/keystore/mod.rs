//! Password-encrypted keystore, version 3 layout
//!
//! One JSON record per identity:
//!
//! - scrypt or PBKDF2-HMAC-SHA256 derives a 32-byte key from the password
//! - AES-128-CTR encrypts the 32-byte private key with bytes `0..16`
//! - keccak-256 over bytes `16..32` and the ciphertext authenticates it
//!
//! Decryption checks the MAC in constant time before touching the
//! ciphertext. A wrong password and a damaged record both surface as
//! [`KeystoreError::DecryptionFailed`].
//!
//! # Example
//!
//! ```rust,ignore
//! use valforge_crypto::keystore::{KeystoreBuilder, KeystoreStore};
//!
//! let keystore = KeystoreBuilder::new()
//!     .private_key(&key_bytes)
//!     .password("my-strong-password")
//!     .username("validator1.sat")
//!     .role("validator")
//!     .build()?;
//!
//! let store = KeystoreStore::new("./keys")?;
//! store.save("validator1.sat", &keystore)?;
//!
//! let key = store.decrypt("validator1.sat", "my-strong-password")?;
//! ```

mod cipher;
mod encrypted;
mod error;
mod kdf;
mod mac;
mod store;

pub use cipher::{decrypt_secret, encrypt_secret, CipherParams, CIPHER_AES_128_CTR, IV_LENGTH};
pub use encrypted::{
    parse_private_key, CryptoSection, DecryptedKey, Keystore, KeystoreBuilder, KEYSTORE_VERSION,
};
pub use error::{KeystoreError, KeystoreResult};
pub use kdf::{
    pbkdf2_derive_key, scrypt_derive_key, KdfChoice, KdfParams, PBKDF2_C, PBKDF2_MIN_ITERATIONS,
    SCRYPT_N, SCRYPT_P, SCRYPT_R,
};
pub use mac::{compute_mac, verify_mac};
pub use store::{KeystoreStore, KEYSTORE_FILE_SUFFIX};
