//! Keccak-256 MAC for keystore integrity verification
//!
//! The MAC is computed over: derived_key[16:32] || ciphertext
//! A match proves both that the right password was used and that the
//! ciphertext is the one produced with that key.

use alloy_primitives::keccak256;

use super::error::{KeystoreError, KeystoreResult};

/// Length of the derived key required to compute a MAC
pub const MAC_KEY_END: usize = 32;

/// Start of the MAC key material inside the derived key
pub const MAC_KEY_START: usize = 16;

/// Compute keccak256(derived_key[16:32] || ciphertext)
pub fn compute_mac(derived_key: &[u8], ciphertext: &[u8]) -> KeystoreResult<[u8; 32]> {
    if derived_key.len() < MAC_KEY_END {
        return Err(KeystoreError::InvalidKdfParams(format!(
            "derived key must be at least {} bytes, got {}",
            MAC_KEY_END,
            derived_key.len()
        )));
    }

    let mut preimage = Vec::with_capacity(MAC_KEY_END - MAC_KEY_START + ciphertext.len());
    preimage.extend_from_slice(&derived_key[MAC_KEY_START..MAC_KEY_END]);
    preimage.extend_from_slice(ciphertext);

    Ok(keccak256(&preimage).0)
}

/// Verify a stored MAC.
///
/// Returns `Err(DecryptionFailed)` on mismatch; the caller cannot tell a
/// wrong password from a damaged record.
pub fn verify_mac(derived_key: &[u8], ciphertext: &[u8], expected: &[u8]) -> KeystoreResult<()> {
    let computed = compute_mac(derived_key, ciphertext)?;

    if constant_time_eq(&computed, expected) {
        Ok(())
    } else {
        Err(KeystoreError::DecryptionFailed)
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
