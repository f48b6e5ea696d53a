//! Common utilities for keystore commands

use crate::config::ProvisionConfig;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use valforge_crypto::{ExposeSecret, KeystoreStore, SecretString};
use zeroize::Zeroizing;

/// Minimum password length for new keystores
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Open the keystore directory configured for `home`, creating it if needed.
pub fn open_store(home: &Path, config: &ProvisionConfig) -> Result<KeystoreStore> {
    let dir = config.effective_keystore_dir(home);
    KeystoreStore::new(&dir)
        .with_context(|| format!("Failed to open keystore directory: {}", dir.display()))
}

/// Resolve the keystore password.
///
/// A password file wins over `VALFORGE_KEYSTORE_PASSWORD`; without either
/// the password is prompted for.
pub fn get_password(
    config: &ProvisionConfig,
    password_file: Option<&Path>,
    prompt: &str,
    confirm: bool,
) -> Result<SecretString> {
    if let Some(file) = password_file {
        return read_password_from_file(file);
    }
    if let Some(password) = &config.keystore_password {
        return Ok(password.expose_secret().to_string().into());
    }
    prompt_password(prompt, confirm)
}

/// Read a password from a file, ignoring surrounding whitespace.
pub fn read_password_from_file(path: &Path) -> Result<SecretString> {
    let content = Zeroizing::new(
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read password file: {}", path.display()))?,
    );

    let password = content.trim();
    if password.is_empty() {
        return Err(anyhow!("Password file is empty"));
    }

    Ok(password.to_string().into())
}

/// Prompt for a password with optional confirmation.
pub fn prompt_password(prompt: &str, confirm: bool) -> Result<SecretString> {
    let password =
        Zeroizing::new(rpassword::prompt_password(prompt).context("Failed to read password")?);

    if confirm {
        let confirmation = Zeroizing::new(
            rpassword::prompt_password("Confirm password: ")
                .context("Failed to read password confirmation")?,
        );

        if *password != *confirmation {
            return Err(anyhow!("Passwords do not match"));
        }
    }

    Ok(password.as_str().to_string().into())
}

/// Reject passwords too short to protect a new keystore.
pub fn validate_password_strength(password: &SecretString) -> Result<()> {
    let length = password.expose_secret().chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(anyhow!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

/// Memo the EVM signup transfer carries for a new account.
pub fn signup_memo(identity: &str, public_key: &str) -> String {
    format!("{}-{}", identity, public_key)
}
