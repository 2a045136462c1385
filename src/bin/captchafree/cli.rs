//! Command-line interface definition.

use captchafree::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Skip the CAPTCHA with a small on-chain payment.
#[derive(Parser, Debug)]
#[command(name = "captchafree")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding persisted verifications.
    #[arg(long, env = "CAPTCHAFREE_STORAGE_DIR", global = true)]
    pub storage_dir: Option<PathBuf>,

    /// JSON-RPC endpoint of a node with unlocked accounts.
    #[arg(long, env = "CAPTCHAFREE_RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Log level (overrides the config file).
    #[arg(long, env = "RUST_LOG", global = true)]
    pub log_level: Option<String>,

    /// Path to configuration file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show whether an address holds a current verification.
    Status {
        /// Owner address.
        #[arg(long, short)]
        address: String,
    },

    /// Verify, sending the fee unless a current verification exists.
    Verify {
        /// Owner address (defaults to the wallet's account).
        #[arg(long, short)]
        address: Option<String>,

        /// Record a simulated verification without a wallet.
        #[arg(long)]
        demo: bool,
    },

    /// Forget an address's verification.
    Clear {
        /// Owner address.
        #[arg(long, short)]
        address: String,
    },
}

impl Cli {
    /// Build the effective configuration: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<AppConfig> {
        let mut config = if let Some(ref path) = self.config {
            AppConfig::from_file(path)?
        } else {
            AppConfig::default()
        };

        if let Some(ref storage_dir) = self.storage_dir {
            config.storage_dir.clone_from(storage_dir);
        }
        if let Some(ref rpc_url) = self.rpc_url {
            config.rpc.url.clone_from(rpc_url);
        }
        if let Some(ref log_level) = self.log_level {
            config.log_level.clone_from(log_level);
        }

        if let Command::Verify { demo: true, .. } = self.command {
            config.verification.demo_mode = true;
        }

        Ok(config)
    }
}
