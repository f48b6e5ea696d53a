//! Provisioning configuration
//!
//! Settings live in `{home}/config/valforge.toml`. Values from the
//! environment (and a `.env` file loaded at startup) take precedence over
//! the file.
//!
//! # Example valforge.toml
//!
//! ```toml
//! # Directory holding keystore files (empty: {home}/keys)
//! keystore-dir = ""
//!
//! # EVM address receiving validator rewards
//! reward-address = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4"
//!
//! # Role written into new keystores
//! role = "xsat_validator"
//!
//! # Key derivation for new keystores (scrypt|pbkdf2)
//! kdf = "scrypt"
//!
//! # Whole-identity retries after the first attempt
//! identity-retries = 3
//!
//! [client]
//! nodes = ["https://rpc-1.example.com", "https://rpc-2.example.com"]
//! max-retries = 3
//! retry-base-delay = 1000
//! ```

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use valforge_crypto::{KdfChoice, SecretString};
use valforge_rpc::NodeClientConfig;

/// Configuration filename inside `{home}/config`.
pub const CONFIG_FILENAME: &str = "valforge.toml";

/// Keystore directory name inside home.
pub const DEFAULT_KEYSTORE_DIR: &str = "keys";

/// Candidate RPC endpoints, comma separated or a JSON array
pub const ENV_RPC_URLS: &str = "VALFORGE_RPC_URLS";

/// Keystore directory override
pub const ENV_KEYSTORE_DIR: &str = "VALFORGE_KEYSTORE_DIR";

/// Keystore password, used instead of prompting
pub const ENV_KEYSTORE_PASSWORD: &str = "VALFORGE_KEYSTORE_PASSWORD";

/// Reward address override
pub const ENV_REWARD_ADDRESS: &str = "VALFORGE_REWARD_ADDRESS";

/// Configuration for the `valforge` binary.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProvisionConfig {
    /// Directory for keystore files.
    ///
    /// If empty, uses the default: `{home}/keys`
    #[serde(default)]
    pub keystore_dir: String,

    /// EVM address (`0x` + 40 hex) receiving stake and rewards.
    #[serde(default)]
    pub reward_address: String,

    /// Role recorded in new keystores.
    #[serde(default = "default_role")]
    pub role: String,

    /// Key derivation function for new keystores (scrypt|pbkdf2).
    #[serde(default = "default_kdf")]
    pub kdf: String,

    /// PBKDF2 iteration count; the default is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbkdf2_iterations: Option<u32>,

    /// Retries of a whole identity after its first failed attempt.
    #[serde(default = "default_identity_retries")]
    pub identity_retries: u32,

    /// Delay unit of the identity retry; retry n waits `n * delay` ms.
    #[serde(default = "default_identity_retry_delay")]
    pub identity_retry_delay: u64,

    /// Keystore password taken from the environment. Never written out.
    #[serde(skip)]
    pub keystore_password: Option<SecretString>,

    /// Node pool and retry behaviour.
    #[serde(default)]
    pub client: NodeClientConfig,
}

fn default_role() -> String {
    "xsat_validator".to_string()
}

fn default_kdf() -> String {
    "scrypt".to_string()
}

fn default_identity_retries() -> u32 {
    3
}

fn default_identity_retry_delay() -> u64 {
    1000
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            keystore_dir: String::new(),
            reward_address: String::new(),
            role: default_role(),
            kdf: default_kdf(),
            pbkdf2_iterations: None,
            identity_retries: default_identity_retries(),
            identity_retry_delay: default_identity_retry_delay(),
            keystore_password: None,
            client: NodeClientConfig::default(),
        }
    }
}

impl ProvisionConfig {
    /// Get the path to the config file.
    pub fn config_path(home: &Path) -> PathBuf {
        home.join("config").join(CONFIG_FILENAME)
    }

    /// Load the config file and apply process environment overrides.
    pub fn load(home: &Path) -> Result<Self> {
        let mut config = Self::load_file(home)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load the config file only.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load_file(home: &Path) -> Result<Self> {
        let config_path = Self::config_path(home);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", config_path.display()))
    }

    /// Save configuration to file.
    pub fn save(&self, home: &Path) -> Result<()> {
        let config_path = Self::config_path(home);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

        Ok(())
    }

    /// Override settings from environment variables read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(urls) = get(ENV_RPC_URLS) {
            self.client.nodes = parse_rpc_urls(&urls)
                .with_context(|| format!("Invalid {}", ENV_RPC_URLS))?;
        }
        if let Some(dir) = get(ENV_KEYSTORE_DIR) {
            self.keystore_dir = dir;
        }
        if let Some(address) = get(ENV_REWARD_ADDRESS) {
            self.reward_address = address.trim().to_string();
        }
        if let Some(password) = lookup(ENV_KEYSTORE_PASSWORD).filter(|p| !p.is_empty()) {
            self.keystore_password = Some(password.into());
        }

        Ok(())
    }

    /// Resolve the effective keystore directory.
    ///
    /// Returns in order of precedence:
    /// 1. `keystore_dir` from config (if non-empty)
    /// 2. Default: `{home}/keys`
    pub fn effective_keystore_dir(&self, home: &Path) -> PathBuf {
        if self.keystore_dir.is_empty() {
            home.join(DEFAULT_KEYSTORE_DIR)
        } else {
            PathBuf::from(&self.keystore_dir)
        }
    }

    /// KDF selection for new keystores.
    pub fn kdf_choice(&self) -> Result<KdfChoice> {
        match self.kdf.to_lowercase().as_str() {
            "scrypt" => Ok(KdfChoice::scrypt()),
            "pbkdf2" => Ok(match self.pbkdf2_iterations {
                Some(c) => KdfChoice::pbkdf2_with_iterations(c),
                None => KdfChoice::pbkdf2(),
            }),
            other => Err(anyhow!("Unsupported kdf {:?} (expected scrypt|pbkdf2)", other)),
        }
    }

    /// Delay before whole-identity retry number `retry` (1-based).
    pub fn identity_delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.identity_retry_delay.saturating_mul(retry as u64))
    }

    /// Node client settings, checked for use.
    pub fn node_client_config(&self) -> Result<NodeClientConfig> {
        if self.client.nodes.is_empty() {
            bail!(
                "No RPC endpoints configured (set [client] nodes or {})",
                ENV_RPC_URLS
            );
        }
        self.client
            .validate()
            .map_err(|e| anyhow!("Invalid client config: {}", e))?;
        Ok(self.client.clone())
    }
}

/// Parse an endpoint list given as a JSON array or comma separated text.
pub fn parse_rpc_urls(text: &str) -> Result<Vec<String>> {
    let text = text.trim();
    let urls: Vec<String> = if text.starts_with('[') {
        serde_json::from_str(text).context("Expected a JSON array of strings")?
    } else {
        text.split(',').map(str::to_string).collect()
    };

    let urls: Vec<String> = urls
        .into_iter()
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .collect();

    if urls.is_empty() {
        bail!("No endpoints given");
    }
    Ok(urls)
}
