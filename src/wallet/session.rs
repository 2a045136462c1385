//! A connected wallet.

use super::{ProviderError, WalletProvider, UNRECOGNIZED_CHAIN};
use crate::chain::{parse_hex_quantity, to_hex_quantity, ChainConfig};
use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A wallet connection with a known account and chain.
///
/// Created by [`WalletSession::connect`] and ended by
/// [`WalletSession::disconnect`]; there is no ambient global wallet.
pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    chain: ChainConfig,
    address: String,
    chain_id: Option<u64>,
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("expected_chain", &self.chain.id)
            .finish_non_exhaustive()
    }
}

impl WalletSession {
    /// Connect to the wallet and make sure it is on `chain`.
    ///
    /// May suspend while the wallet shows its approval prompt.
    ///
    /// # Errors
    ///
    /// - [`Error::TransactionRejected`] if the user declines a prompt
    /// - [`Error::WalletNotConnected`] if the wallet exposes no account
    /// - [`Error::WrongNetwork`] if the wallet stays on another chain
    /// - [`Error::Provider`] for any other provider failure
    pub async fn connect(provider: Arc<dyn WalletProvider>, chain: ChainConfig) -> Result<Self> {
        let accounts = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(prompt_error)?;
        let address = first_account(&accounts)?;
        debug!("Wallet returned account {}", address);

        switch_chain(provider.as_ref(), &chain).await?;

        let chain_id = read_chain_id(provider.as_ref()).await?;
        if chain_id != chain.id {
            return Err(Error::WrongNetwork {
                expected: chain.id,
                expected_name: chain.name.clone(),
                actual: Some(chain_id),
            });
        }

        info!("Connected {} on {} ({})", address, chain.name, chain_id);
        Ok(Self {
            provider,
            chain,
            address,
            chain_id: Some(chain_id),
        })
    }

    /// The connected account.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The chain the wallet last reported.
    #[must_use]
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    /// The chain this session must be on.
    #[must_use]
    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Whether the wallet is on the configured chain.
    #[must_use]
    pub fn is_correct_network(&self) -> bool {
        self.chain_id == Some(self.chain.id)
    }

    /// Apply a `chainChanged` notification from the wallet.
    ///
    /// An unparseable id leaves the chain unknown.
    pub fn on_chain_changed(&mut self, hex_chain_id: &str) {
        self.chain_id = parse_hex_quantity(hex_chain_id).ok();
        if self.is_correct_network() {
            debug!("Chain changed to {:?}", self.chain_id);
        } else {
            warn!("Wrong network detected: {:?}", self.chain_id);
        }
    }

    /// Fail with [`Error::WrongNetwork`] unless on the configured chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongNetwork`] if the chain differs or is unknown.
    pub fn ensure_network(&self) -> Result<()> {
        if self.is_correct_network() {
            Ok(())
        } else {
            Err(Error::WrongNetwork {
                expected: self.chain.id,
                expected_name: self.chain.name.clone(),
                actual: self.chain_id,
            })
        }
    }

    /// Send `value_wei` of the native unit to `to` and return the
    /// transaction hash.
    ///
    /// Suspends until the wallet returns a hash or rejects. Exactly one
    /// `eth_sendTransaction` request is made.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongNetwork`] if not on the configured chain (nothing is sent)
    /// - [`Error::TransactionRejected`] if the user declines
    /// - [`Error::TransactionFailed`] for any other failure
    pub async fn send_value(&self, to: &str, value_wei: u128) -> Result<String> {
        self.ensure_network()?;

        let params = json!([{
            "from": self.address,
            "to": to,
            "value": to_hex_quantity(value_wei),
            "chainId": self.chain.hex_id(),
        }]);
        debug!("eth_sendTransaction params: {}", params);

        let response = self
            .provider
            .request("eth_sendTransaction", params)
            .await
            .map_err(|e| {
                if e.is_user_rejection() {
                    Error::TransactionRejected(e.message)
                } else {
                    Error::TransactionFailed(e.to_string())
                }
            })?;

        match response {
            Value::String(hash) if !hash.is_empty() => {
                info!("Transaction sent: {}", hash);
                Ok(hash)
            }
            other => Err(Error::TransactionFailed(format!(
                "wallet returned no transaction hash: {other}"
            ))),
        }
    }

    /// End the session.
    pub fn disconnect(self) {
        info!("Disconnected {}", self.address);
    }
}

fn prompt_error(e: ProviderError) -> Error {
    if e.is_user_rejection() {
        Error::TransactionRejected(e.message)
    } else {
        Error::Provider(e.to_string())
    }
}

fn first_account(accounts: &Value) -> Result<String> {
    accounts
        .as_array()
        .and_then(|list| list.first())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(Error::WalletNotConnected)
}

async fn switch_chain(provider: &dyn WalletProvider, chain: &ChainConfig) -> Result<()> {
    let params = json!([{ "chainId": chain.hex_id() }]);
    match provider.request("wallet_switchEthereumChain", params).await {
        Ok(_) => {
            debug!("Switched to {}", chain.name);
            Ok(())
        }
        Err(e) if e.code == UNRECOGNIZED_CHAIN => {
            info!("{} unknown to wallet, adding it", chain.name);
            provider
                .request("wallet_addEthereumChain", chain.add_chain_params())
                .await
                .map_err(|add_err| {
                    warn!("Failed to add {}: {}", chain.name, add_err);
                    if add_err.is_user_rejection() {
                        Error::TransactionRejected(add_err.message)
                    } else {
                        Error::Provider(format!(
                            "Please add the {} network to your wallet",
                            chain.name
                        ))
                    }
                })?;
            Ok(())
        }
        Err(e) => {
            warn!("Failed to switch to {}: {}", chain.name, e);
            Err(prompt_error(e))
        }
    }
}

async fn read_chain_id(provider: &dyn WalletProvider) -> Result<u64> {
    let response = provider
        .request("eth_chainId", json!([]))
        .await
        .map_err(|e| Error::Provider(e.to_string()))?;
    let hex = response
        .as_str()
        .ok_or_else(|| Error::Provider(format!("eth_chainId returned {response}")))?;
    parse_hex_quantity(hex)
}
