//! Zeroizing containers for passwords and key bytes
//!
//! Debug output of every type here prints `[REDACTED]`.

mod secret;

pub use secret::{IntoSecret, SecretBytes, SecretString};
