//! Keystore management CLI
//!
//! - `create`: Generate or import a key and store it encrypted
//! - `show`: Print the public part of an identity's keystore
//! - `list`: List all keystores in the keystore directory
//!
//! Passwords come from `--password-file`, `VALFORGE_KEYSTORE_PASSWORD` or an
//! interactive prompt that does not echo.

pub mod common;
pub mod create;
pub mod list;
pub mod show;

use crate::config::ProvisionConfig;
use anyhow::Result;
use clap::Subcommand;
use std::path::{Path, PathBuf};

/// Keystore subcommands
#[derive(Subcommand)]
pub enum KeysCommand {
    /// Create an encrypted keystore for an identity
    ///
    /// Generates a fresh key unless --private-key-file is given. Prints
    /// the public key and the memo the EVM signup transfer expects.
    Create {
        /// Identity (account name) the key belongs to
        #[arg(long)]
        identity: String,

        /// Import the key from a file (0x-hex, bare hex or WIF)
        #[arg(long)]
        private_key_file: Option<PathBuf>,

        /// Read password from file instead of prompting
        #[arg(long)]
        password_file: Option<PathBuf>,

        /// Overwrite an existing keystore
        #[arg(long)]
        force: bool,
    },

    /// Show the public information of an identity's keystore
    Show {
        /// Identity to show
        #[arg(long)]
        identity: String,

        /// Decrypt the keystore to check the password
        #[arg(long)]
        verify: bool,

        /// Read password from file instead of prompting
        #[arg(long)]
        password_file: Option<PathBuf>,

        /// Output format (text|json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List all keystores in the keystore directory
    List {
        /// Output format (text|json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Execute a keys command
pub fn execute_keys_command(
    home: &Path,
    config: &ProvisionConfig,
    command: KeysCommand,
) -> Result<()> {
    match command {
        KeysCommand::Create {
            identity,
            private_key_file,
            password_file,
            force,
        } => create::execute(
            home,
            config,
            &identity,
            private_key_file,
            password_file,
            force,
        ),

        KeysCommand::Show {
            identity,
            verify,
            password_file,
            format,
        } => show::execute(home, config, &identity, verify, password_file, &format),

        KeysCommand::List { format } => list::execute(home, config, &format),
    }
}
