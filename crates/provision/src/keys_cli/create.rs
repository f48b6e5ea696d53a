//! Keystore creation command implementation
//!
//! Generates a fresh secp256k1 key (or imports one) and stores it in an
//! encrypted keystore for the identity.

use super::common::{get_password, open_store, signup_memo, validate_password_strength};
use crate::config::ProvisionConfig;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use valforge_crypto::keystore::parse_private_key;
use valforge_crypto::{
    AntelopePrivateKey, AntelopePublicKey, ExposeSecret, KdfChoice, KeystoreBuilder,
    KeystoreStore, SecretString,
};
use valforge_rpc::Name;
use zeroize::Zeroizing;

/// Result of writing a new keystore
#[derive(Debug)]
pub struct CreatedKeystore {
    /// File the keystore was written to
    pub path: PathBuf,
    /// Public key recorded as the keystore address
    pub public_key: AntelopePublicKey,
}

/// Execute the create command
pub fn execute(
    home: &Path,
    config: &ProvisionConfig,
    identity: &str,
    private_key_file: Option<PathBuf>,
    password_file: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let store = open_store(home, config)?;

    if store.exists(identity) && !force {
        return Err(anyhow!(
            "Keystore for {} already exists in {}\nUse --force to overwrite it.",
            identity,
            store.root().display()
        ));
    }

    let private_key = match &private_key_file {
        Some(path) => read_private_key(path)?,
        None => {
            println!("Generating new key for {}...", identity);
            let key = AntelopePrivateKey::generate(&mut rand::rngs::OsRng);
            Zeroizing::new(key.to_bytes().to_vec())
        }
    };

    let password = get_password(
        config,
        password_file.as_deref(),
        "Enter password for keystore encryption: ",
        password_file.is_none() && config.keystore_password.is_none(),
    )?;
    validate_password_strength(&password)?;

    let created = create_keystore(
        &store,
        identity,
        &private_key,
        &password,
        &config.role,
        config.kdf_choice()?,
        force,
    )?;

    let public_key = created.public_key.to_string();
    println!();
    println!("Keystore created successfully!");
    println!();
    println!("  Identity:    {}", identity);
    println!("  Public Key:  {}", public_key);
    println!("  Legacy Key:  {}", created.public_key.to_legacy_string());
    if let Ok(name) = identity.parse::<Name>() {
        println!("  EVM Address: {}", name.to_evm_address());
    }
    println!("  Path:        {}", created.path.display());
    println!();
    println!("EVM signup memo:");
    println!("  {}", signup_memo(identity, &public_key));

    Ok(())
}

/// Encrypt `private_key` and write it to the store under `identity`.
///
/// An existing keystore is only overwritten when `force` is set.
pub fn create_keystore(
    store: &KeystoreStore,
    identity: &str,
    private_key: &[u8],
    password: &SecretString,
    role: &str,
    kdf: KdfChoice,
    force: bool,
) -> Result<CreatedKeystore> {
    let keystore = KeystoreBuilder::new()
        .private_key(private_key)
        .password(password.expose_secret())
        .username(identity)
        .role(role)
        .kdf(kdf)
        .build()
        .context("Failed to encrypt private key")?;

    let public_key: AntelopePublicKey = keystore
        .address
        .parse()
        .context("Keystore address is not a public key")?;

    let path = if force {
        store.replace(identity, &keystore)
    } else {
        store.save(identity, &keystore)
    }
    .with_context(|| format!("Failed to write keystore for {}", identity))?;

    info!(
        identity,
        kdf = kdf.function(),
        path = %path.display(),
        "Created keystore"
    );

    Ok(CreatedKeystore { path, public_key })
}

fn read_private_key(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let text = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read private key file: {}", path.display()))?,
    );
    parse_private_key(&text).context("Invalid private key")
}
