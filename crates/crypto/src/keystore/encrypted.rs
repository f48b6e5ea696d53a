//! Version 3 keystore record
//!
//! Combines the KDF, cipher and MAC modules into the on-disk JSON record
//! and owns the encrypt/decrypt round trip.

use std::fmt;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::cipher::{decrypt_secret, encrypt_secret, generate_iv, CipherParams, CIPHER_AES_128_CTR};
use super::error::{KeystoreError, KeystoreResult};
use super::kdf::{generate_salt, KdfChoice, KdfParams};
use super::mac::{compute_mac, verify_mac};
use crate::antelope::{AntelopePrivateKey, AntelopePublicKey};
use crate::secure::{SecretBytes, SecretString};

/// Only record version this crate reads or writes
pub const KEYSTORE_VERSION: u32 = 3;

/// Raw private key length
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Encrypted keystore record, one per identity.
///
/// `address` is informational: it holds the `PUB_K1_` form of the key's
/// public key and is only trusted after the key has been decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keystore {
    /// Schema version, always 3
    pub version: u32,
    /// Random identifier, not used cryptographically
    pub id: String,
    /// Public key derived from the private key
    pub address: String,
    /// Caller-supplied identity name
    #[serde(default)]
    pub username: String,
    /// Caller-supplied role
    #[serde(default)]
    pub role: String,
    /// Encryption envelope
    pub crypto: CryptoSection,
}

/// The `crypto` envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CryptoSection {
    /// Cipher identifier, always `aes-128-ctr`
    pub cipher: String,
    /// Hex-encoded encrypted private key
    pub ciphertext: String,
    /// Cipher parameters
    pub cipherparams: CipherParams,
    /// KDF tag (`scrypt` or `pbkdf2`)
    pub kdf: String,
    /// KDF parameters, interpreted according to `kdf`
    pub kdfparams: KdfParams,
    /// Hex-encoded keccak-256 MAC
    pub mac: String,
}

impl Keystore {
    /// Encrypt `private_key` with default scrypt parameters.
    pub fn encrypt(
        private_key: &[u8],
        password: impl AsRef<[u8]>,
        username: &str,
        role: &str,
    ) -> KeystoreResult<Self> {
        KeystoreBuilder::new()
            .private_key(private_key)
            .password(password)
            .username(username)
            .role(role)
            .build()
    }

    /// Parse a record from JSON, rejecting any version other than 3.
    pub fn from_json(json: &str) -> KeystoreResult<Self> {
        let keystore: Self = serde_json::from_str(json)?;
        if keystore.version != KEYSTORE_VERSION {
            return Err(KeystoreError::UnsupportedVersion(keystore.version));
        }
        Ok(keystore)
    }

    /// Serialize to compact JSON
    pub fn to_json(&self) -> KeystoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decrypt the private key and check it against `address`.
    ///
    /// The MAC does not cover the IV; comparing the recovered public key
    /// with `address` catches a modified IV. Every failure after key
    /// derivation is reported as [`KeystoreError::DecryptionFailed`].
    pub fn decrypt(&self, password: impl AsRef<[u8]>) -> KeystoreResult<DecryptedKey> {
        let key = self.decrypt_unverified_address(password)?;

        let stored: AntelopePublicKey = self
            .address
            .parse()
            .map_err(|_| KeystoreError::DecryptionFailed)?;
        if stored != key.public_key() {
            return Err(KeystoreError::DecryptionFailed);
        }

        Ok(key)
    }

    /// Decrypt the private key, verifying only the MAC.
    pub fn decrypt_unverified_address(
        &self,
        password: impl AsRef<[u8]>,
    ) -> KeystoreResult<DecryptedKey> {
        if self.version != KEYSTORE_VERSION {
            return Err(KeystoreError::UnsupportedVersion(self.version));
        }
        if self.crypto.cipher != CIPHER_AES_128_CTR {
            return Err(KeystoreError::UnsupportedCipher(self.crypto.cipher.clone()));
        }

        let derived_key = self
            .crypto
            .kdfparams
            .derive_key(&self.crypto.kdf, password.as_ref())?;
        let dk_bytes = derived_key.expose_secret();

        let ciphertext = hex::decode(&self.crypto.ciphertext)
            .map_err(|e| KeystoreError::HexError(format!("invalid ciphertext hex: {}", e)))?;
        let mac = hex::decode(&self.crypto.mac)
            .map_err(|e| KeystoreError::HexError(format!("invalid mac hex: {}", e)))?;

        // Verify MAC before decrypting
        verify_mac(dk_bytes, &ciphertext, &mac)?;

        let iv = self.crypto.cipherparams.iv()?;
        let plaintext = decrypt_secret(&ciphertext, dk_bytes, &iv)?;

        DecryptedKey::new(plaintext)
    }

    /// The record's identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The informational public key
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// A decrypted private key. Bytes are zeroized on drop.
pub struct DecryptedKey {
    secret: SecretBytes,
    key: AntelopePrivateKey,
}

impl DecryptedKey {
    fn new(secret: SecretBytes) -> KeystoreResult<Self> {
        let key = AntelopePrivateKey::from_bytes(secret.expose_secret())
            .map_err(|_| KeystoreError::DecryptionFailed)?;
        Ok(Self { secret, key })
    }

    /// Raw 32 private key bytes
    pub fn expose_bytes(&self) -> &[u8] {
        self.secret.expose_secret()
    }

    /// The key as a signing key
    pub fn private_key(&self) -> &AntelopePrivateKey {
        &self.key
    }

    /// WIF text form of the key
    pub fn to_wif(&self) -> SecretString {
        self.key.to_wif().into()
    }

    /// Public key of the decrypted private key
    pub fn public_key(&self) -> AntelopePublicKey {
        self.key.public_key()
    }
}

impl fmt::Debug for DecryptedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedKey")
            .field("public_key", &self.public_key())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Parse private key text: `0x` + 64 hex characters, 64 bare hex
/// characters, or WIF.
pub fn parse_private_key(text: &str) -> KeystoreResult<Zeroizing<Vec<u8>>> {
    let text = text.trim();

    let hex_body = match text.strip_prefix("0x") {
        Some(body) => Some(body),
        None if text.len() == PRIVATE_KEY_LENGTH * 2
            && text.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            Some(text)
        }
        None => None,
    };

    match hex_body {
        Some(body) => {
            if body.len() != PRIVATE_KEY_LENGTH * 2 {
                return Err(KeystoreError::InvalidPrivateKey(format!(
                    "hex private key must be {} characters, got {}",
                    PRIVATE_KEY_LENGTH * 2,
                    body.len()
                )));
            }
            let bytes = hex::decode(body).map_err(|e| {
                KeystoreError::InvalidPrivateKey(format!("not valid hex: {}", e))
            })?;
            Ok(Zeroizing::new(bytes))
        }
        None => {
            let key = AntelopePrivateKey::from_wif(text)
                .map_err(|e| KeystoreError::InvalidPrivateKey(e.to_string()))?;
            Ok(Zeroizing::new(key.to_bytes().to_vec()))
        }
    }
}

/// Builder for creating [`Keystore`] records
///
/// Salt, IV and id are random unless set, which makes the builder usable
/// for deterministic fixtures.
#[derive(Default)]
pub struct KeystoreBuilder {
    private_key: Option<Zeroizing<Vec<u8>>>,
    password: Option<Zeroizing<Vec<u8>>>,
    username: String,
    role: String,
    kdf: KdfChoice,
    salt: Option<Vec<u8>>,
    iv: Option<Vec<u8>>,
    id: Option<String>,
}

impl KeystoreBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw private key to encrypt
    pub fn private_key(mut self, private_key: &[u8]) -> Self {
        self.private_key = Some(Zeroizing::new(private_key.to_vec()));
        self
    }

    /// Set the password. Strings are used as their UTF-8 bytes.
    pub fn password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.password = Some(Zeroizing::new(password.as_ref().to_vec()));
        self
    }

    /// Set the identity name stored as `username`
    pub fn username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    /// Set the role metadata
    pub fn role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    /// Choose the KDF (scrypt by default)
    pub fn kdf(mut self, kdf: KdfChoice) -> Self {
        self.kdf = kdf;
        self
    }

    /// Use a fixed salt
    pub fn salt(mut self, salt: &[u8]) -> Self {
        self.salt = Some(salt.to_vec());
        self
    }

    /// Use a fixed IV; must be 16 bytes
    pub fn iv(mut self, iv: &[u8]) -> Self {
        self.iv = Some(iv.to_vec());
        self
    }

    /// Use a fixed record id
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Build the keystore
    pub fn build(self) -> KeystoreResult<Keystore> {
        let private_key = self
            .private_key
            .ok_or(KeystoreError::MissingField("private_key"))?;
        if private_key.len() != PRIVATE_KEY_LENGTH {
            return Err(KeystoreError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LENGTH,
                private_key.len()
            )));
        }
        let signing_key = AntelopePrivateKey::from_bytes(&private_key)
            .map_err(|e| KeystoreError::InvalidPrivateKey(e.to_string()))?;

        let password = self.password.ok_or(KeystoreError::MissingField("password"))?;

        let iv = match self.iv {
            Some(iv) if iv.len() != super::cipher::IV_LENGTH => {
                return Err(KeystoreError::InvalidIvLength(iv.len()))
            }
            Some(iv) => iv,
            None => generate_iv(),
        };
        let salt = self.salt.unwrap_or_else(generate_salt);

        let function = self.kdf.function();
        let kdfparams = self.kdf.into_params(&salt);
        let derived_key = kdfparams.derive_key(function, &password)?;
        let dk_bytes = derived_key.expose_secret();

        // Encrypt with bytes 0..16, authenticate with bytes 16..32
        let ciphertext = encrypt_secret(&private_key, dk_bytes, &iv)?;
        let mac = compute_mac(dk_bytes, &ciphertext)?;

        let crypto = CryptoSection {
            cipher: CIPHER_AES_128_CTR.to_string(),
            ciphertext: hex::encode(&ciphertext),
            cipherparams: CipherParams::new(&iv),
            kdf: function.to_string(),
            kdfparams,
            mac: hex::encode(mac),
        };

        Ok(Keystore {
            version: KEYSTORE_VERSION,
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            address: signing_key.public_key().to_string(),
            username: self.username,
            role: self.role,
            crypto,
        })
    }
}
