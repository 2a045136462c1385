//! The verification record and its stored JSON shape.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Proof that an owner address paid the verification fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    /// Address that sent the verification transaction.
    pub owner_address: String,
    /// Hash returned by the wallet for the transaction.
    pub transaction_hash: String,
    /// When the transaction was accepted.
    pub timestamp: DateTime<Utc>,
}

impl VerificationRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(
        owner_address: impl Into<String>,
        transaction_hash: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            owner_address: owner_address.into(),
            transaction_hash: transaction_hash.into(),
            timestamp,
        }
    }

    /// Whether this record belongs to `owner_address`.
    #[must_use]
    pub fn is_owned_by(&self, owner_address: &str) -> bool {
        self.owner_address.eq_ignore_ascii_case(owner_address)
    }

    /// Whether the record is still honored at `now`.
    ///
    /// A timestamp in the future counts as current.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        now.signed_duration_since(self.timestamp) < validity
    }

    /// The instant after which the record is no longer honored.
    ///
    /// Saturates at the largest representable instant.
    #[must_use]
    pub fn expires_at(&self, validity: Duration) -> DateTime<Utc> {
        self.timestamp
            .checked_add_signed(validity)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Encode as the stored JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let stored = StoredRecord {
            timestamp: self.timestamp,
            transaction_hash: self.transaction_hash.clone(),
            owner_address: Some(self.owner_address.clone()),
        };
        Ok(serde_json::to_string(&stored)?)
    }

    /// Decode a stored JSON object.
    ///
    /// Records written without an `ownerAddress` cannot be attributed to
    /// anyone and are reported as corrupt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageCorrupt`] if the value is not a valid record.
    pub fn from_json(raw: &str) -> Result<Self> {
        let stored: StoredRecord =
            serde_json::from_str(raw).map_err(|e| Error::StorageCorrupt(e.to_string()))?;
        let owner_address = stored
            .owner_address
            .ok_or_else(|| Error::StorageCorrupt("record has no ownerAddress".to_string()))?;
        Ok(Self {
            owner_address,
            transaction_hash: stored.transaction_hash,
            timestamp: stored.timestamp,
        })
    }
}

/// Wire shape: `{ timestamp: epoch ms, transactionHash, ownerAddress? }`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    transaction_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner_address: Option<String>,
}
