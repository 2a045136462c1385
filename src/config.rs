//! Configuration for captchafree.

use crate::chain::{to_base_units, ChainConfig};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// The zero address used as the verification fee's sink.
pub const SENTINEL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Longest accepted validity window (100 years).
pub const MAX_VALIDITY_HOURS: u64 = 100 * 365 * 24;

/// Where the verification fee goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    /// The zero address.
    #[default]
    Sentinel,
    /// Back to the owner's own address.
    Owner,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding persisted verifications (one origin).
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Chain the wallet must be on.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Verification fee and validity.
    #[serde(default)]
    pub verification: VerificationConfig,

    /// JSON-RPC wallet endpoint.
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// Verification fee and validity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Fee as a decimal amount of the native unit.
    #[serde(default = "default_amount")]
    pub amount: String,

    /// Where the fee is sent.
    #[serde(default)]
    pub recipient: Recipient,

    /// How long a verification is honored, in hours.
    #[serde(default = "default_validity_hours")]
    pub validity_hours: u64,

    /// Record a simulated verification instead of sending a transaction.
    #[serde(default)]
    pub demo_mode: bool,
}

/// JSON-RPC endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Endpoint URL of a node with unlocked accounts.
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            log_level: default_log_level(),
            chain: ChainConfig::default(),
            verification: VerificationConfig::default(),
            rpc: RpcConfig::default(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            amount: default_amount(),
            recipient: Recipient::default(),
            validity_hours: default_validity_hours(),
            demo_mode: false,
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl VerificationConfig {
    /// The fee in wei.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAmount`] if `amount` is not a valid amount.
    pub fn amount_wei(&self) -> Result<u128> {
        to_base_units(&self.amount, 18)
    }

    /// The validity window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the window exceeds
    /// [`MAX_VALIDITY_HOURS`] or does not fit the timestamp range.
    pub fn validity(&self) -> Result<chrono::Duration> {
        let out_of_range =
            || Error::Config(format!("validity_hours out of range: {}", self.validity_hours));
        if self.validity_hours > MAX_VALIDITY_HOURS {
            return Err(out_of_range());
        }
        let window = i64::try_from(self.validity_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .ok_or_else(out_of_range)?;
        chrono::Utc::now()
            .checked_add_signed(window)
            .map(|_| window)
            .ok_or_else(out_of_range)
    }

    /// Address the fee is sent to for `owner_address`.
    #[must_use]
    pub fn recipient_for(&self, owner_address: &str) -> String {
        match self.recipient {
            Recipient::Sentinel => SENTINEL_ADDRESS.to_string(),
            Recipient::Owner => owner_address.to_string(),
        }
    }
}

impl RpcConfig {
    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_storage_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "captchafree")
        .map(|dirs| dirs.data_dir().join("origin"))
        .unwrap_or_else(|| PathBuf::from(".captchafree"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_amount() -> String {
    "0.001".to_string()
}

const fn default_validity_hours() -> u64 {
    24
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
