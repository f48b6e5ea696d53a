//! Key Derivation Function (KDF) implementation
//!
//! Supports the two KDFs of the version 3 keystore layout: scrypt and
//! PBKDF2-HMAC-SHA256. The KDF is chosen once at encryption time through
//! [`KdfChoice`]; decryption branches only on the stored `kdf` tag.

use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::error::{KeystoreError, KeystoreResult};
use crate::secure::SecretBytes;

/// Default scrypt parameters
pub const SCRYPT_N: u32 = 8192; // 2^13
pub const SCRYPT_R: u32 = 8; // block size
pub const SCRYPT_P: u32 = 1; // parallelization

/// Default PBKDF2 iteration count
pub const PBKDF2_C: u32 = 600_000;

/// PBKDF2 iteration floor. Anything lower is rejected.
pub const PBKDF2_MIN_ITERATIONS: u32 = 100_000;

/// Only PRF accepted for PBKDF2
pub const PBKDF2_PRF: &str = "hmac-sha256";

/// Derived key length in bytes
pub const DKLEN: u32 = 32;

/// Salt length in bytes
pub const SALT_LENGTH: usize = 32;

/// Stored `kdf` tag for scrypt
pub const KDF_SCRYPT: &str = "scrypt";

/// Stored `kdf` tag for PBKDF2
pub const KDF_PBKDF2: &str = "pbkdf2";

/// KDF selection made by the caller when encrypting a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfChoice {
    /// scrypt with explicit cost parameters
    Scrypt { n: u32, r: u32, p: u32, dklen: u32 },
    /// PBKDF2-HMAC-SHA256 with an explicit iteration count
    Pbkdf2 { c: u32, dklen: u32 },
}

impl Default for KdfChoice {
    fn default() -> Self {
        Self::scrypt()
    }
}

impl KdfChoice {
    /// scrypt with the default parameters
    pub fn scrypt() -> Self {
        Self::Scrypt {
            n: SCRYPT_N,
            r: SCRYPT_R,
            p: SCRYPT_P,
            dklen: DKLEN,
        }
    }

    /// PBKDF2 with the default iteration count
    pub fn pbkdf2() -> Self {
        Self::pbkdf2_with_iterations(PBKDF2_C)
    }

    /// PBKDF2 with a custom iteration count. The floor is enforced when the
    /// key is derived, not here.
    pub fn pbkdf2_with_iterations(c: u32) -> Self {
        Self::Pbkdf2 { c, dklen: DKLEN }
    }

    /// The tag written to the `kdf` field
    pub fn function(&self) -> &'static str {
        match self {
            Self::Scrypt { .. } => KDF_SCRYPT,
            Self::Pbkdf2 { .. } => KDF_PBKDF2,
        }
    }

    /// Resolve the choice into the persisted parameter set for `salt`.
    pub fn into_params(self, salt: &[u8]) -> KdfParams {
        let salt = hex::encode(salt);
        match self {
            Self::Scrypt { n, r, p, dklen } => KdfParams::Scrypt {
                dklen,
                n,
                r,
                p,
                salt,
            },
            Self::Pbkdf2 { c, dklen } => KdfParams::Pbkdf2 {
                dklen,
                c,
                prf: PBKDF2_PRF.to_string(),
                salt,
            },
        }
    }
}

/// Persisted KDF parameters (`crypto.kdfparams`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum KdfParams {
    /// scrypt parameters
    Scrypt {
        /// Derived key length in bytes
        dklen: u32,
        /// CPU/memory cost parameter (must be power of 2)
        n: u32,
        /// Block size parameter
        r: u32,
        /// Parallelization parameter
        p: u32,
        /// Salt as hex string
        salt: String,
    },
    /// PBKDF2 parameters
    Pbkdf2 {
        /// Derived key length in bytes
        dklen: u32,
        /// Iteration count
        c: u32,
        /// Pseudo-random function, always `hmac-sha256`
        prf: String,
        /// Salt as hex string
        salt: String,
    },
}

impl KdfParams {
    /// Derive a key from `password` using the KDF named by the stored `kdf`
    /// tag. The parameter set must agree with the tag.
    pub fn derive_key(&self, function: &str, password: &[u8]) -> KeystoreResult<SecretBytes> {
        match (function, self) {
            (
                KDF_SCRYPT,
                KdfParams::Scrypt {
                    dklen,
                    n,
                    r,
                    p,
                    salt,
                },
            ) => scrypt_derive_key(password, &decode_salt(salt)?, *n, *r, *p, *dklen as usize),
            (
                KDF_PBKDF2,
                KdfParams::Pbkdf2 {
                    dklen,
                    c,
                    prf,
                    salt,
                },
            ) => {
                if prf != PBKDF2_PRF {
                    return Err(KeystoreError::InvalidKdfParams(format!(
                        "unsupported prf: {}",
                        prf
                    )));
                }
                pbkdf2_derive_key(password, &decode_salt(salt)?, *c, *dklen as usize)
            }
            (KDF_SCRYPT | KDF_PBKDF2, _) => Err(KeystoreError::InvalidKdfParams(format!(
                "kdfparams do not match kdf {}",
                function
            ))),
            (other, _) => Err(KeystoreError::UnsupportedKdf(other.to_string())),
        }
    }
}

fn decode_salt(salt: &str) -> KeystoreResult<Vec<u8>> {
    hex::decode(salt).map_err(|e| KeystoreError::HexError(format!("invalid salt hex: {}", e)))
}

fn check_dklen(dklen: usize) -> KeystoreResult<()> {
    // bytes 16..32 of the derived key feed the MAC
    if dklen < DKLEN as usize {
        return Err(KeystoreError::InvalidKdfParams(format!(
            "dklen must be at least {}, got {}",
            DKLEN, dklen
        )));
    }
    Ok(())
}

/// Derive a key using scrypt KDF
///
/// # Arguments
///
/// * `password` - Raw password bytes
/// * `salt` - Random salt bytes
/// * `n` - CPU/memory cost parameter (must be power of 2)
/// * `r` - Block size parameter
/// * `p` - Parallelization parameter
/// * `dklen` - Desired key length in bytes
pub fn scrypt_derive_key(
    password: &[u8],
    salt: &[u8],
    n: u32,
    r: u32,
    p: u32,
    dklen: usize,
) -> KeystoreResult<SecretBytes> {
    check_dklen(dklen)?;
    if n < 2 || !n.is_power_of_two() {
        return Err(KeystoreError::InvalidKdfParams(format!(
            "n must be a power of 2 greater than 1, got {}",
            n
        )));
    }
    let log_n = n.trailing_zeros() as u8;

    let params = scrypt::Params::new(log_n, r, p, dklen)
        .map_err(|e| KeystoreError::InvalidKdfParams(e.to_string()))?;

    let mut output = vec![0u8; dklen];
    scrypt::scrypt(password, salt, &params, &mut output)
        .map_err(|e| KeystoreError::KdfError(e.to_string()))?;

    Ok(secrecy::SecretBox::new(Box::new(output)))
}

/// Derive a key using PBKDF2-HMAC-SHA256
///
/// Fails with [`KeystoreError::InsufficientIterations`] when `c` is below
/// [`PBKDF2_MIN_ITERATIONS`].
pub fn pbkdf2_derive_key(
    password: &[u8],
    salt: &[u8],
    c: u32,
    dklen: usize,
) -> KeystoreResult<SecretBytes> {
    if c < PBKDF2_MIN_ITERATIONS {
        return Err(KeystoreError::InsufficientIterations {
            minimum: PBKDF2_MIN_ITERATIONS,
            actual: c,
        });
    }
    check_dklen(dklen)?;

    let mut output = vec![0u8; dklen];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, c, &mut output);

    Ok(secrecy::SecretBox::new(Box::new(output)))
}

/// Generate a random salt
pub fn generate_salt() -> Vec<u8> {
    use rand::RngCore;
    let mut salt = vec![0u8; SALT_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_scrypt_derive_key() {
        let password = b"test-passphrase";
        let salt = vec![0xAA; 32];

        let derived = scrypt_derive_key(password, &salt, 1024, 8, 1, 32).unwrap();
        assert_eq!(derived.expose_secret().len(), 32);

        // Same inputs produce same output
        let derived2 = scrypt_derive_key(password, &salt, 1024, 8, 1, 32).unwrap();
        assert_eq!(derived.expose_secret(), derived2.expose_secret());

        let derived3 = scrypt_derive_key(b"different", &salt, 1024, 8, 1, 32).unwrap();
        assert_ne!(derived.expose_secret(), derived3.expose_secret());
    }

    #[test]
    fn test_scrypt_rejects_bad_params() {
        let salt = [0u8; 32];
        assert!(matches!(
            scrypt_derive_key(b"pw", &salt, 12345, 8, 1, 32),
            Err(KeystoreError::InvalidKdfParams(_))
        ));
        assert!(matches!(
            scrypt_derive_key(b"pw", &salt, 1024, 8, 1, 16),
            Err(KeystoreError::InvalidKdfParams(_))
        ));
    }

    #[test]
    fn test_pbkdf2_iteration_floor() {
        let salt = [0x11; 32];

        let result = pbkdf2_derive_key(b"pw", &salt, 99_999, 32);
        assert!(matches!(
            result,
            Err(KeystoreError::InsufficientIterations {
                minimum: 100_000,
                actual: 99_999
            })
        ));

        let derived = pbkdf2_derive_key(b"pw", &salt, 100_000, 32).unwrap();
        assert_eq!(derived.expose_secret().len(), 32);
    }

    #[test]
    fn test_password_bytes_used_verbatim() {
        // "é" precomposed vs decomposed must derive different keys
        let salt = [0x22; 32];
        let composed = pbkdf2_derive_key("\u{e9}".as_bytes(), &salt, 100_000, 32).unwrap();
        let decomposed = pbkdf2_derive_key("e\u{301}".as_bytes(), &salt, 100_000, 32).unwrap();
        assert_ne!(composed.expose_secret(), decomposed.expose_secret());
    }

    #[test]
    fn test_derive_branches_on_tag() {
        let params = KdfChoice::Scrypt {
            n: 1024,
            r: 8,
            p: 1,
            dklen: 32,
        }
        .into_params(&[0xBB; 32]);

        assert!(params.derive_key(KDF_SCRYPT, b"pw").is_ok());
        assert!(matches!(
            params.derive_key(KDF_PBKDF2, b"pw"),
            Err(KeystoreError::InvalidKdfParams(_))
        ));
        assert!(matches!(
            params.derive_key("argon2", b"pw"),
            Err(KeystoreError::UnsupportedKdf(_))
        ));
    }

    #[test]
    fn test_kdf_params_serialization() {
        let scrypt = KdfChoice::scrypt().into_params(&[0xCC; 32]);
        let json = serde_json::to_value(&scrypt).unwrap();
        assert_eq!(json["n"], 8192);
        assert_eq!(json["dklen"], 32);
        let parsed: KdfParams = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, scrypt);

        let pbkdf2 = KdfChoice::pbkdf2().into_params(&[0xDD; 32]);
        let json = serde_json::to_value(&pbkdf2).unwrap();
        assert_eq!(json["c"], 600_000);
        assert_eq!(json["prf"], "hmac-sha256");
        let parsed: KdfParams = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, pbkdf2);
    }

    #[test]
    fn test_generate_salt() {
        let salt1 = generate_salt();
        let salt2 = generate_salt();

        assert_eq!(salt1.len(), SALT_LENGTH);
        assert_ne!(salt1, salt2);
    }
}
