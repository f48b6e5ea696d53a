//! Keystore show command implementation
//!
//! Prints the public part of an identity's keystore. With `--verify` the
//! keystore is also decrypted to prove the password opens it.

use super::common::{get_password, open_store};
use crate::config::ProvisionConfig;
use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use valforge_crypto::{ExposeSecret, KeystoreError};
use valforge_rpc::Name;

/// Execute the show command
pub fn execute(
    home: &Path,
    config: &ProvisionConfig,
    identity: &str,
    verify: bool,
    password_file: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    let store = open_store(home, config)?;
    let path = store.locate(identity).map_err(|e| match e {
        KeystoreError::NotFound { .. } => anyhow!(
            "{}\nRun 'valforge keys create --identity {}' first.",
            e,
            identity
        ),
        other => other.into(),
    })?;
    let keystore = store
        .load(identity)
        .with_context(|| format!("Failed to load keystore: {}", path.display()))?;

    let verified = if verify {
        let password = get_password(
            config,
            password_file.as_deref(),
            "Enter keystore password: ",
            false,
        )?;
        keystore
            .decrypt(password.expose_secret())
            .with_context(|| format!("Failed to decrypt keystore for {}", identity))?;
        true
    } else {
        false
    };

    let evm_address = identity.parse::<Name>().ok().map(|n| n.to_evm_address());

    match format {
        "json" => {
            let output = json!({
                "identity": identity,
                "id": keystore.id,
                "address": keystore.address,
                "username": keystore.username,
                "role": keystore.role,
                "kdf": keystore.crypto.kdf,
                "evm_address": evm_address,
                "path": path.display().to_string(),
                "verified": verified,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("Identity:    {}", identity);
            println!("Keystore ID: {}", keystore.id);
            println!("Public Key:  {}", keystore.address);
            println!("Username:    {}", keystore.username);
            println!("Role:        {}", keystore.role);
            println!("KDF:         {}", keystore.crypto.kdf);
            if let Some(address) = evm_address {
                println!("EVM Address: {}", address);
            }
            println!("Path:        {}", path.display());
            if verified {
                println!("Password:    verified");
            }
        }
    }

    Ok(())
}
