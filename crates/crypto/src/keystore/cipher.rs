//! AES-128-CTR cipher for keystore encryption
//!
//! CTR mode is a stream cipher: ciphertext length equals plaintext length
//! and no padding is involved. Only the first 16 bytes of the derived key
//! are used as the AES key.

use aes::Aes128;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use serde::{Deserialize, Serialize};

use super::error::{KeystoreError, KeystoreResult};
use crate::secure::SecretBytes;

/// The only cipher written to and accepted from `crypto.cipher`
pub const CIPHER_AES_128_CTR: &str = "aes-128-ctr";

/// IV (initialization vector) length for AES-128-CTR
pub const IV_LENGTH: usize = 16;

/// AES-128 key length
pub const AES_KEY_LENGTH: usize = 16;

/// Type alias for AES-128-CTR cipher
type Aes128Ctr = Ctr128BE<Aes128>;

/// Cipher parameters for AES-128-CTR (`crypto.cipherparams`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CipherParams {
    /// Initialization vector as hex string
    pub iv: String,
}

impl CipherParams {
    /// Create parameters from raw IV bytes
    pub fn new(iv: &[u8]) -> Self {
        Self {
            iv: hex::encode(iv),
        }
    }

    /// Decode the IV, enforcing its length
    pub fn iv(&self) -> KeystoreResult<Vec<u8>> {
        let iv = hex::decode(&self.iv)
            .map_err(|e| KeystoreError::HexError(format!("invalid IV hex: {}", e)))?;
        check_iv(&iv)?;
        Ok(iv)
    }
}

fn check_iv(iv: &[u8]) -> KeystoreResult<()> {
    if iv.len() != IV_LENGTH {
        return Err(KeystoreError::InvalidIvLength(iv.len()));
    }
    Ok(())
}

fn apply_keystream(data: &[u8], derived_key: &[u8], iv: &[u8]) -> KeystoreResult<Vec<u8>> {
    if derived_key.len() < AES_KEY_LENGTH {
        return Err(KeystoreError::InvalidCipherParams(format!(
            "key must be at least {} bytes, got {}",
            AES_KEY_LENGTH,
            derived_key.len()
        )));
    }
    check_iv(iv)?;

    let key: [u8; AES_KEY_LENGTH] = derived_key[..AES_KEY_LENGTH]
        .try_into()
        .map_err(|_| KeystoreError::InvalidCipherParams("key conversion failed".to_string()))?;
    let iv_arr: [u8; IV_LENGTH] = iv
        .try_into()
        .map_err(|_| KeystoreError::InvalidIvLength(iv.len()))?;

    let mut cipher = Aes128Ctr::new(&key.into(), &iv_arr.into());
    let mut output = data.to_vec();
    cipher.apply_keystream(&mut output);
    Ok(output)
}

/// Encrypt secret data using AES-128-CTR
///
/// # Arguments
///
/// * `secret` - The secret data to encrypt
/// * `derived_key` - The derived key; only bytes `0..16` are used
/// * `iv` - 16-byte initialization vector
pub fn encrypt_secret(secret: &[u8], derived_key: &[u8], iv: &[u8]) -> KeystoreResult<Vec<u8>> {
    apply_keystream(secret, derived_key, iv)
}

/// Decrypt secret data using AES-128-CTR
pub fn decrypt_secret(
    ciphertext: &[u8],
    derived_key: &[u8],
    iv: &[u8],
) -> KeystoreResult<SecretBytes> {
    let plaintext = apply_keystream(ciphertext, derived_key, iv)?;
    Ok(secrecy::SecretBox::new(Box::new(plaintext)))
}

/// Generate a random IV
pub fn generate_iv() -> Vec<u8> {
    use rand::RngCore;
    let mut iv = vec![0u8; IV_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}
