//! Secret wrappers around the `secrecy` crate

use secrecy::{SecretBox, SecretString as SecrecySecretString};

/// Byte buffer that is zeroized on drop.
///
/// Holds derived keys and decrypted private keys. Read it with
/// `expose_secret()`.
///
/// ```rust
/// use valforge_crypto::secure::SecretBytes;
/// use secrecy::ExposeSecret;
///
/// let secret = SecretBytes::new(Box::new(vec![1, 2, 3, 4]));
/// assert_eq!(secret.expose_secret(), &vec![1, 2, 3, 4]);
/// ```
pub type SecretBytes = SecretBox<Vec<u8>>;

/// String that is zeroized on drop, used for keystore passwords and WIF text.
pub type SecretString = SecrecySecretString;

/// Conversion into the matching secret wrapper.
pub trait IntoSecret {
    /// The secret type this converts into.
    type Secret;

    /// Convert into a secret value.
    fn into_secret(self) -> Self::Secret;
}

impl IntoSecret for String {
    type Secret = SecretString;

    fn into_secret(self) -> Self::Secret {
        self.into()
    }
}

impl IntoSecret for Vec<u8> {
    type Secret = SecretBytes;

    fn into_secret(self) -> Self::Secret {
        SecretBox::new(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_password_into_secret() {
        let secret = "validator-password".to_string().into_secret();
        let exposed: &str = secret.expose_secret();
        assert_eq!(exposed, "validator-password");
    }

    #[test]
    fn test_bytes_into_secret() {
        let secret = vec![0xAB; 32].into_secret();
        assert_eq!(secret.expose_secret().len(), 32);
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = "hunter2".to_string().into_secret();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));
    }
}
