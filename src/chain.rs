//! Chain metadata and native-unit amount conversion.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Native currency description, as sent with `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Number of decimals of the smallest unit.
    pub decimals: u8,
}

/// The chain a visitor must be on to verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id.
    pub id: u64,
    /// Human-readable chain name.
    pub name: String,
    /// Public JSON-RPC endpoint.
    pub rpc_url: String,
    /// Block explorer base URL (no trailing slash).
    pub explorer_url: String,
    /// Native currency.
    pub native_currency: NativeCurrency,
}

impl ChainConfig {
    /// Base Sepolia testnet.
    #[must_use]
    pub fn base_sepolia() -> Self {
        Self {
            id: 84532,
            name: "Base Sepolia".to_string(),
            rpc_url: "https://sepolia.base.org".to_string(),
            explorer_url: "https://sepolia.basescan.org".to_string(),
            native_currency: NativeCurrency {
                name: "Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
        }
    }

    /// Chain id as a `0x`-prefixed hex quantity.
    #[must_use]
    pub fn hex_id(&self) -> String {
        to_hex_quantity(self.id)
    }

    /// Explorer link for a transaction.
    #[must_use]
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }

    /// Parameters for `wallet_addEthereumChain`.
    #[must_use]
    pub fn add_chain_params(&self) -> Value {
        json!([{
            "chainId": self.hex_id(),
            "chainName": self.name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": [self.explorer_url],
        }])
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::base_sepolia()
    }
}

/// Parse a `0x`-prefixed hex quantity such as a chain id.
///
/// # Errors
///
/// Returns an error if the value is not valid hex or overflows `u64`.
pub fn parse_hex_quantity(value: &str) -> Result<u64> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| Error::Provider(format!("expected hex quantity, got {value:?}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::Provider(format!("invalid hex quantity {value:?}: {e}")))
}

/// Convert a decimal amount of the native unit into its smallest unit.
///
/// The conversion is exact: `"0.001"` with 18 decimals is `10^15`. Amounts
/// with more fractional digits than `decimals`, negative amounts and
/// anything that is not a plain decimal number are rejected.
///
/// # Errors
///
/// Returns [`Error::InvalidAmount`] if the amount cannot be represented.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<u128> {
    let invalid = |reason: &str| Error::InvalidAmount(format!("{amount:?}: {reason}"));
    let amount_trimmed = amount.trim();
    if amount_trimmed.is_empty() {
        return Err(invalid("empty"));
    }

    let (whole, frac) = amount_trimmed
        .split_once('.')
        .unwrap_or((amount_trimmed, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > usize::from(decimals) {
        return Err(invalid("too many decimal places"));
    }

    let scale = 10u128
        .checked_pow(u32::from(decimals))
        .ok_or_else(|| invalid("too many decimals"))?;
    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| invalid("too large"))?
    };
    let frac_units = if frac.is_empty() {
        0
    } else {
        let pad = u32::from(decimals) - u32::try_from(frac.len()).map_err(|_| invalid("too long"))?;
        frac.parse::<u128>().map_err(|_| invalid("too large"))? * 10u128.pow(pad)
    };

    whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| invalid("too large"))
}

/// Encode a quantity as `0x`-prefixed hex with no leading zeros.
#[must_use]
pub fn to_hex_quantity(value: impl Into<u128>) -> String {
    format!("{:#x}", value.into())
}
