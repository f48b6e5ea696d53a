//! Secp256k1 keys in Antelope text encodings
//!
//! Antelope chains identify keys by base58 strings with a 4-byte checksum:
//!
//! - `PUB_K1_<base58(pubkey33 || ripemd160(pubkey33 || "K1")[..4])>`
//! - `EOS<base58(pubkey33 || ripemd160(pubkey33)[..4])>` (legacy)
//! - `SIG_K1_<base58(sig65 || ripemd160(sig65 || "K1")[..4])>`
//! - WIF private keys: `base58(0x80 || key || sha256d(0x80 || key)[..4])`
//!
//! Uses the k256 crate for secp256k1 curve operations.

use std::fmt;
use std::str::FromStr;

use k256::{
    ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    SecretKey as K256SecretKey,
};
use rand::{CryptoRng, RngCore};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Curve suffix mixed into K1 checksums
pub const KEY_TYPE_K1: &str = "K1";

/// Prefix of modern public key strings
pub const PUBLIC_KEY_PREFIX: &str = "PUB_K1_";

/// Prefix of legacy public key strings
pub const LEGACY_PUBLIC_KEY_PREFIX: &str = "EOS";

/// Prefix of signature strings
pub const SIGNATURE_PREFIX: &str = "SIG_K1_";

/// WIF version byte for private keys
pub const WIF_VERSION: u8 = 0x80;

/// Compact signature header offset (27 + 4 for compressed keys)
const COMPACT_HEADER_BASE: u8 = 31;

fn ripemd_checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix);
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2], digest[3]]
}

fn sha256d_checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_with_checksum(payload: &[u8], checksum: [u8; 4]) -> String {
    let mut buf = Vec::with_capacity(payload.len() + 4);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum);
    bs58::encode(buf).into_string()
}

/// Decode base58 text into `N` payload bytes and the trailing 4-byte checksum
fn decode_with_checksum<const N: usize>(text: &str) -> Option<([u8; N], [u8; 4])> {
    let raw = bs58::decode(text).into_vec().ok()?;
    if raw.len() != N + 4 {
        return None;
    }
    let mut payload = [0u8; N];
    payload.copy_from_slice(&raw[..N]);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&raw[N..]);
    Some((payload, checksum))
}

/// Secp256k1 private key (32 bytes scalar)
#[derive(Clone)]
pub struct AntelopePrivateKey(K256SecretKey);

impl AntelopePrivateKey {
    /// Generate a new random private key
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self(K256SecretKey::random(rng))
    }

    /// Load from raw bytes (32 bytes scalar)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidSecretKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        K256SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSecretKey("not a valid secp256k1 scalar".to_string()))
    }

    /// Parse a WIF-encoded private key
    pub fn from_wif(wif: &str) -> Result<Self, CryptoError> {
        let (payload, checksum) = decode_with_checksum::<33>(wif)
            .ok_or_else(|| CryptoError::InvalidSecretKey("malformed WIF".to_string()))?;
        if payload[0] != WIF_VERSION {
            return Err(CryptoError::InvalidSecretKey(format!(
                "unexpected WIF version byte 0x{:02x}",
                payload[0]
            )));
        }
        if sha256d_checksum(&payload) != checksum {
            return Err(CryptoError::ChecksumMismatch);
        }
        Self::from_bytes(&payload[1..])
    }

    /// Serialize to bytes (32 bytes scalar)
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    /// Encode as WIF (uncompressed form, as Antelope tooling expects)
    pub fn to_wif(&self) -> String {
        let mut payload = [0u8; 33];
        payload[0] = WIF_VERSION;
        payload[1..].copy_from_slice(&self.to_bytes());
        let checksum = sha256d_checksum(&payload);
        encode_with_checksum(&payload, checksum)
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> AntelopePublicKey {
        AntelopePublicKey(self.0.public_key())
    }

    /// Sign a 32-byte digest.
    ///
    /// The result is low-S normalized. Antelope nodes additionally require
    /// the canonical form checked by [`AntelopeSignature::is_canonical`];
    /// callers re-sign over a modified message when that check fails.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<AntelopeSignature, CryptoError> {
        let signing_key = SigningKey::from(&self.0);
        let (sig, recid) = signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[0] = COMPACT_HEADER_BASE + recid.to_byte();
        bytes[1..].copy_from_slice(&sig.to_bytes());
        Ok(AntelopeSignature(bytes))
    }
}

impl fmt::Debug for AntelopePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AntelopePrivateKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Secp256k1 public key
#[derive(Clone, PartialEq, Eq)]
pub struct AntelopePublicKey(k256::PublicKey);

impl AntelopePublicKey {
    /// Load from compressed bytes (33 bytes)
    pub fn from_bytes(bytes: &[u8; 33]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey("not a valid curve point".to_string()))
    }

    /// Serialize to compressed bytes (33 bytes)
    pub fn to_bytes(&self) -> [u8; 33] {
        let encoded = self.0.to_encoded_point(true);
        let mut result = [0u8; 33];
        result.copy_from_slice(encoded.as_bytes());
        result
    }

    /// Legacy `EOS…` text form
    pub fn to_legacy_string(&self) -> String {
        let bytes = self.to_bytes();
        format!(
            "{}{}",
            LEGACY_PUBLIC_KEY_PREFIX,
            encode_with_checksum(&bytes, ripemd_checksum(&bytes, b""))
        )
    }
}

impl fmt::Display for AntelopePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(
            f,
            "{}{}",
            PUBLIC_KEY_PREFIX,
            encode_with_checksum(&bytes, ripemd_checksum(&bytes, KEY_TYPE_K1.as_bytes()))
        )
    }
}

impl fmt::Debug for AntelopePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AntelopePublicKey({})", self)
    }
}

impl FromStr for AntelopePublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (body, suffix): (&str, &[u8]) = if let Some(body) = s.strip_prefix(PUBLIC_KEY_PREFIX)
        {
            (body, KEY_TYPE_K1.as_bytes())
        } else if let Some(body) = s.strip_prefix(LEGACY_PUBLIC_KEY_PREFIX) {
            (body, b"")
        } else {
            return Err(CryptoError::InvalidPublicKey(format!(
                "unknown prefix in {}",
                s
            )));
        };

        let (payload, checksum) = decode_with_checksum::<33>(body)
            .ok_or_else(|| CryptoError::InvalidPublicKey("malformed base58".to_string()))?;
        if ripemd_checksum(&payload, suffix) != checksum {
            return Err(CryptoError::ChecksumMismatch);
        }
        Self::from_bytes(&payload)
    }
}

/// Compact recoverable signature: header byte || r || s
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AntelopeSignature([u8; 65]);

impl AntelopeSignature {
    /// Raw compact bytes
    pub fn to_bytes(&self) -> [u8; 65] {
        self.0
    }

    /// Whether nodes will accept this signature: neither `r` nor `s` may
    /// have the high bit set or carry a redundant leading zero byte.
    pub fn is_canonical(&self) -> bool {
        let c = &self.0;
        c[1] & 0x80 == 0
            && !(c[1] == 0 && c[2] & 0x80 == 0)
            && c[33] & 0x80 == 0
            && !(c[33] == 0 && c[34] & 0x80 == 0)
    }

    /// Recover the signing public key for `digest`
    pub fn recover(&self, digest: &[u8; 32]) -> Result<AntelopePublicKey, CryptoError> {
        let recid = self.0[0]
            .checked_sub(COMPACT_HEADER_BASE)
            .and_then(RecoveryId::from_byte)
            .ok_or_else(|| CryptoError::InvalidSignature("bad header byte".to_string()))?;
        let sig = K256Signature::from_slice(&self.0[1..])
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        let key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        Ok(AntelopePublicKey(key.into()))
    }
}

impl fmt::Display for AntelopeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            SIGNATURE_PREFIX,
            encode_with_checksum(&self.0, ripemd_checksum(&self.0, KEY_TYPE_K1.as_bytes()))
        )
    }
}

impl fmt::Debug for AntelopeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AntelopeSignature({})", hex::encode(&self.0[..8]))
    }
}

impl FromStr for AntelopeSignature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or_else(|| CryptoError::InvalidSignature(format!("unknown prefix in {}", s)))?;
        let (payload, checksum) = decode_with_checksum::<65>(body)
            .ok_or_else(|| CryptoError::InvalidSignature("malformed base58".to_string()))?;
        if ripemd_checksum(&payload, KEY_TYPE_K1.as_bytes()) != checksum {
            return Err(CryptoError::ChecksumMismatch);
        }
        Ok(Self(payload))
    }
}
