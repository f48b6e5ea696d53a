//! Keystore list command implementation
//!
//! Lists the identities with a keystore in the keystore directory, in both
//! the flat and the nested layout. Needs no password.

use super::common::open_store;
use crate::config::ProvisionConfig;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use valforge_crypto::keystore::KEYSTORE_FILE_SUFFIX;
use valforge_crypto::KeystoreStore;

/// Public information about a discovered keystore
#[derive(Debug, serde::Serialize)]
pub struct KeystoreEntry {
    /// Identity the file belongs to
    pub identity: String,
    /// Public key, or `None` if the file is not a readable keystore
    pub address: Option<String>,
    /// Keystore file
    pub path: PathBuf,
}

/// Execute the list command
pub fn execute(home: &Path, config: &ProvisionConfig, format: &str) -> Result<()> {
    let store = open_store(home, config)?;
    let entries = scan(&store)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            if entries.is_empty() {
                println!("No keystores found in {}", store.root().display());
                return Ok(());
            }
            for entry in &entries {
                println!(
                    "{:<14} {:<58} {}",
                    entry.identity,
                    entry.address.as_deref().unwrap_or("<unreadable>"),
                    entry.path.display()
                );
            }
        }
    }

    Ok(())
}

/// Find every keystore under the store root, sorted by identity.
///
/// An identity present in both layouts is listed once, with the file that
/// [`KeystoreStore::locate`] would pick.
pub fn scan(store: &KeystoreStore) -> Result<Vec<KeystoreEntry>> {
    let mut identities = Vec::new();

    for entry in fs::read_dir(store.root())? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };

        if path.is_file() {
            if let Some(identity) = name.strip_suffix(KEYSTORE_FILE_SUFFIX) {
                identities.push(identity.to_string());
            }
        } else if path.is_dir() && store.nested_path(name).is_file() {
            identities.push(name.to_string());
        }
    }

    identities.sort();
    identities.dedup();

    let entries = identities
        .into_iter()
        .filter_map(|identity| {
            let path = store.locate(&identity).ok()?;
            let address = store.load(&identity).ok().map(|k| k.address);
            Some(KeystoreEntry {
                identity,
                address,
                path,
            })
        })
        .collect();

    Ok(entries)
}
