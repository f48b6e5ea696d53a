//! valforge CLI
//!
//! Creates validator keystores and registers validators on exSat.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use valforge::{
    execute_account_check, execute_keys_command, execute_nodes_check, execute_register,
    KeysCommand, ProvisionConfig, DEFAULT_HOME_DIR, EXIT_CONFIG_ERROR, VALFORGE_HOME_ENV,
};

/// exSat validator provisioning
#[derive(Parser)]
#[command(name = "valforge")]
#[command(author = "valforge contributors")]
#[command(version)]
#[command(about = "exSat validator provisioning", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Directory for config and keystores
    #[arg(long, global = true, default_value_os_t = default_home_dir())]
    home: PathBuf,

    /// The logging level (trace|debug|info|warn|error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// The logging format (json|plain)
    #[arg(long, global = true, default_value = "plain")]
    log_format: String,

    /// Disable colored logs
    #[arg(long, global = true, default_value = "false")]
    log_no_color: bool,

    /// Print out full error chain on errors
    #[arg(long, global = true, default_value = "false")]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage encrypted validator keystores
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },

    /// Look up an identity's account and validator registration
    Account {
        /// Identity (account name) to check
        #[arg(long)]
        identity: String,

        /// Output format (text|json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Register an identity as a validator
    ///
    /// Skips identities that are already registered. The whole attempt is
    /// retried identity-retries times before giving up.
    Register {
        /// Identity (account name) to register
        #[arg(long)]
        identity: String,

        /// EVM address receiving stake and rewards (overrides config)
        #[arg(long)]
        reward_address: Option<String>,

        /// Read keystore password from file instead of prompting
        #[arg(long)]
        password_file: Option<PathBuf>,
    },

    /// Probe every configured RPC node
    Nodes {
        /// Output format (text|json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Write the effective configuration to {home}/config/valforge.toml
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, default_value = "false")]
        overwrite: bool,
    },
}

fn default_home_dir() -> PathBuf {
    if let Ok(home) = std::env::var(VALFORGE_HOME_ENV) {
        return PathBuf::from(home);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_HOME_DIR)
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, &cli.log_format, cli.log_no_color);

    let config = match ProvisionConfig::load(&cli.home) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Keys { command } => execute_keys_command(&cli.home, &config, command),

        Commands::Account { identity, format } => {
            execute_account_check(&cli.home, &config, &identity, &format).await
        }

        Commands::Register {
            identity,
            reward_address,
            password_file,
        } => execute_register(&cli.home, &config, &identity, reward_address, password_file).await,

        Commands::Nodes { format } => execute_nodes_check(&config, &format).await,

        Commands::Init { overwrite } => cmd_init(&cli.home, &config, overwrite),
    };

    if let Err(e) = &result {
        if cli.trace {
            eprintln!("Error: {:?}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Load `.env` from the working directory, if present.
fn load_env_file() {
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env: {}", e);
        }
    }
}

fn init_tracing(log_level: &str, log_format: &str, no_color: bool) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(!no_color);

    match log_format {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
}

fn cmd_init(home: &std::path::Path, config: &ProvisionConfig, overwrite: bool) -> Result<()> {
    let path = ProvisionConfig::config_path(home);
    if path.exists() && !overwrite {
        return Err(anyhow::anyhow!(
            "Config already exists at {}\nUse --overwrite to replace it.",
            path.display()
        ));
    }

    config.save(home)?;
    println!("Wrote config to {}", path.display());
    Ok(())
}
