//! Error types for captchafree.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while verifying a visitor.
///
/// Every variant renders as text suitable for showing to the visitor. None of
/// them is fatal: the caller may always retry the action that failed.
#[derive(Debug, Error)]
pub enum Error {
    /// No wallet session is active, or the wallet returned no accounts.
    #[error("Please connect your wallet first")]
    WalletNotConnected,

    /// The wallet is on a different chain than the one configured.
    #[error("Please connect to {expected_name} (chain {expected}). Current network: {}", display_chain(.actual))]
    WrongNetwork {
        /// Configured chain id.
        expected: u64,
        /// Human-readable name of the configured chain.
        expected_name: String,
        /// Chain id reported by the wallet, if any.
        actual: Option<u64>,
    },

    /// The user declined the wallet prompt.
    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    /// The wallet accepted the request but reported a failure.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stored verification record could not be parsed.
    #[error("Stored verification is corrupt: {0}")]
    StorageCorrupt(String),

    /// A verification amount could not be converted to wei.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A display state transition that the state machine does not allow.
    #[error("Invalid state transition from {from} on {event}")]
    InvalidTransition {
        /// State the gate was in.
        from: &'static str,
        /// Event that was applied.
        event: &'static str,
    },

    /// Transport or protocol error talking to the wallet provider.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

fn display_chain(chain_id: &Option<u64>) -> String {
    chain_id.map_or_else(|| "unknown".to_string(), |id| id.to_string())
}
