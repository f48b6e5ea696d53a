//! valforge operator tooling
//!
//! Creates encrypted validator keystores and registers validators on exSat
//! through a pool of RPC nodes.

pub mod chain_cli;
pub mod config;
pub mod keys_cli;

pub use chain_cli::{
    check_account, check_nodes, execute_account_check, execute_nodes_check, execute_register,
    register_identity, retry_identity, AccountStatus, RegistrationOutcome,
};
pub use config::ProvisionConfig;
pub use keys_cli::{execute_keys_command, KeysCommand};

/// Environment variable overriding the home directory
pub const VALFORGE_HOME_ENV: &str = "VALFORGE_HOME";

/// Home directory name under the user's home
pub const DEFAULT_HOME_DIR: &str = ".valforge";

/// Exit code for configuration errors (sysexits.h EX_CONFIG)
pub const EXIT_CONFIG_ERROR: i32 = 78;
