//! Wallet connector boundary.
//!
//! The wallet itself (key custody, signing, approval prompts) is external.
//! This module talks to it through [`WalletProvider`], a request/response
//! interface modelled on EIP-1193 `provider.request({ method, params })`,
//! and wraps a connected wallet in a [`WalletSession`].
//!
//! ```text
//! connect()
//!    │
//!    ▼
//! eth_requestAccounts ──rejected──▶ TransactionRejected
//!    │
//!    ▼
//! wallet_switchEthereumChain ──4902──▶ wallet_addEthereumChain
//!    │                                        │
//!    ▼◀───────────────────────────────────────┘
//! eth_chainId ──mismatch──▶ WrongNetwork
//!    │
//!    ▼
//! WalletSession
//! ```

mod http;
mod session;

pub use http::{HttpProvider, HttpProviderConfig};
pub use session::WalletSession;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// The user rejected the request (EIP-1193).
pub const USER_REJECTED: i64 = 4001;
/// The requested method is not supported by the provider (EIP-1193).
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// The requested chain has not been added to the wallet (EIP-3326).
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC "internal error", also used for transport failures.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error returned by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct ProviderError {
    /// EIP-1193 / JSON-RPC error code.
    pub code: i64,
    /// Message from the provider.
    pub message: String,
}

impl ProviderError {
    /// Create a provider error.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Whether the user declined the request.
    #[must_use]
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }
}

/// An EIP-1193 style wallet provider.
///
/// Calls may suspend for as long as the wallet's approval prompt is open.
/// Closing the prompt must resolve to a [`USER_REJECTED`] error.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Send a request and wait for the wallet's answer.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}
