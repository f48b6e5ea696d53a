//! Validator registration command implementation
//!
//! Registration is idempotent at this level: an identity already present in
//! the validators table is reported and left alone, so a retried identity
//! never registers twice.

use super::{is_unknown_account, retry_identity};
use crate::config::ProvisionConfig;
use crate::keys_cli::common::{get_password, open_store, signup_memo};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use valforge_crypto::{AntelopePrivateKey, AntelopePublicKey, ExposeSecret};
use valforge_rpc::{
    validate_reward_address, Connector, HttpConnector, NodeClient, NodeClientConfig, Signer,
};

/// What a registration attempt found or did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The registration transaction was executed.
    Registered { transaction_id: String },
    /// The identity was already a validator; nothing was submitted.
    AlreadyRegistered,
    /// The account does not exist yet; the EVM signup has to happen first.
    AccountMissing,
}

/// Register `identity` as a validator in one attempt.
///
/// Connects to the pool, skips identities that are already registered or
/// have no account, and otherwise submits the registration signed with
/// `key`.
pub async fn register_identity(
    node_config: NodeClientConfig,
    connector: Arc<dyn Connector>,
    identity: &str,
    key: &AntelopePrivateKey,
    reward_address: &str,
) -> Result<RegistrationOutcome> {
    let signer = Signer::new(identity, key.clone())?;
    let mut client = NodeClient::connect(node_config, connector, signer).await?;

    if client.is_validator_registered(identity).await? {
        info!(identity, "Already registered as validator");
        return Ok(RegistrationOutcome::AlreadyRegistered);
    }

    let account = match client.get_account(identity).await {
        Ok(account) => account,
        Err(e) if is_unknown_account(&e) => {
            warn!(identity, "Account does not exist");
            return Ok(RegistrationOutcome::AccountMissing);
        }
        Err(e) => return Err(e.into()),
    };

    let public_key = key.public_key();
    let active_matches = account
        .permission_key("active")
        .and_then(|k| k.parse::<AntelopePublicKey>().ok())
        .is_some_and(|k| k == public_key);
    if !active_matches {
        warn!(
            identity,
            key = %public_key,
            "Keystore key is not the account's active key"
        );
    }

    info!(identity, endpoint = client.current_endpoint(), "Registering validator");
    let response = client.register_validator(identity, reward_address).await?;
    info!(
        identity,
        transaction_id = %response.transaction_id,
        "Validator registration successful"
    );

    Ok(RegistrationOutcome::Registered {
        transaction_id: response.transaction_id,
    })
}

/// Execute the register command
pub async fn execute_register(
    home: &Path,
    config: &ProvisionConfig,
    identity: &str,
    reward_address: Option<String>,
    password_file: Option<PathBuf>,
) -> Result<()> {
    let reward_address = reward_address.unwrap_or_else(|| config.reward_address.clone());
    if reward_address.is_empty() {
        return Err(anyhow!(
            "No reward address given (use --reward-address, reward-address in the config or {})",
            crate::config::ENV_REWARD_ADDRESS
        ));
    }
    validate_reward_address(&reward_address)?;

    let node_config = config.node_client_config()?;

    let store = open_store(home, config)?;
    let password = get_password(
        config,
        password_file.as_deref(),
        "Enter keystore password: ",
        false,
    )?;
    let key = store
        .decrypt(identity, password.expose_secret())
        .with_context(|| format!("Failed to open keystore for {}", identity))?;

    let connector: Arc<dyn Connector> = Arc::new(HttpConnector::default());
    let outcome = retry_identity(
        identity,
        config.identity_retries,
        |retry| config.identity_delay(retry),
        || {
            register_identity(
                node_config.clone(),
                Arc::clone(&connector),
                identity,
                key.private_key(),
                &reward_address,
            )
        },
    )
    .await?;

    match outcome {
        RegistrationOutcome::Registered { transaction_id } => {
            println!("Validator registration successful: {}", transaction_id);
            Ok(())
        }
        RegistrationOutcome::AlreadyRegistered => {
            println!("{} is already registered as a validator", identity);
            Ok(())
        }
        RegistrationOutcome::AccountMissing => Err(anyhow!(
            "Account {} does not exist yet\nComplete the EVM signup with memo: {}",
            identity,
            signup_memo(identity, &key.public_key().to_string())
        )),
    }
}
