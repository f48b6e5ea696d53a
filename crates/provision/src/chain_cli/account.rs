//! Account check command implementation

use super::is_unknown_account;
use crate::config::ProvisionConfig;
use crate::keys_cli::common::open_store;
use anyhow::Result;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use valforge_crypto::AntelopePublicKey;
use valforge_rpc::{HttpConnector, NodeClient};

/// On-chain state of an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStatus {
    /// Identity looked up
    pub identity: String,
    /// Whether the account exists
    pub exists: bool,
    /// First key of the `owner` permission
    pub owner_key: Option<String>,
    /// First key of the `active` permission
    pub active_key: Option<String>,
    /// Whether the identity has a row in the validators table
    pub registered: bool,
}

impl AccountStatus {
    /// Whether `key` controls the account's `active` permission.
    ///
    /// Keys are compared decoded, so legacy `EOS` and `PUB_K1_` forms of
    /// the same key match.
    pub fn active_key_matches(&self, key: &AntelopePublicKey) -> bool {
        self.active_key
            .as_deref()
            .and_then(|k| k.parse::<AntelopePublicKey>().ok())
            .is_some_and(|k| &k == key)
    }
}

/// Look up `identity` and its validator registration.
pub async fn check_account(client: &mut NodeClient, identity: &str) -> Result<AccountStatus> {
    let account = match client.get_account(identity).await {
        Ok(account) => Some(account),
        Err(e) if is_unknown_account(&e) => None,
        Err(e) => return Err(e.into()),
    };

    let Some(account) = account else {
        return Ok(AccountStatus {
            identity: identity.to_string(),
            exists: false,
            owner_key: None,
            active_key: None,
            registered: false,
        });
    };

    let registered = client.is_validator_registered(identity).await?;

    Ok(AccountStatus {
        identity: identity.to_string(),
        exists: true,
        owner_key: account.owner_key().map(str::to_string),
        active_key: account.permission_key("active").map(str::to_string),
        registered,
    })
}

/// Execute the account check command
pub async fn execute_account_check(
    home: &Path,
    config: &ProvisionConfig,
    identity: &str,
    format: &str,
) -> Result<()> {
    let node_config = config.node_client_config()?;
    let mut client =
        NodeClient::connect_read_only(node_config, Arc::new(HttpConnector::default())).await?;
    let status = check_account(&mut client, identity).await?;

    let local_key = open_store(home, config)?
        .load(identity)
        .ok()
        .and_then(|k| k.address.parse::<AntelopePublicKey>().ok());
    let key_matches = local_key.as_ref().map(|k| status.active_key_matches(k));

    match format {
        "json" => {
            let output = json!({
                "identity": status.identity,
                "exists": status.exists,
                "owner_key": status.owner_key,
                "active_key": status.active_key,
                "registered": status.registered,
                "keystore_matches": key_matches,
                "node": client.current_endpoint(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("Identity:   {}", status.identity);
            if !status.exists {
                println!("Account:    not found");
                return Ok(());
            }
            println!("Account:    exists");
            println!(
                "Owner Key:  {}",
                status.owner_key.as_deref().unwrap_or("<none>")
            );
            println!(
                "Active Key: {}",
                status.active_key.as_deref().unwrap_or("<none>")
            );
            println!(
                "Validator:  {}",
                if status.registered {
                    "registered"
                } else {
                    "not registered"
                }
            );
            match key_matches {
                Some(true) => println!("Keystore:   matches active key"),
                Some(false) => println!("Keystore:   DOES NOT match active key"),
                None => println!("Keystore:   none found locally"),
            }
        }
    }

    Ok(())
}
