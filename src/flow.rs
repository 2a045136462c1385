//! Verification flow: cached check, then one on-chain payment.
//!
//! ```text
//! mount
//!   │
//!   ▼
//! ┌─────────────────────┐
//! │ check_cached(owner) │
//! └─────────┬───────────┘
//!           │
//!    ┌──────┴──────┐
//!    │             │
//! CURRENT     ABSENT / STALE / CORRUPT
//!    │             │
//!    ▼             ▼
//! Verified    user action ─▶ verify(session, owner)
//!                               │
//!                        ┌──────┴──────┐
//!                        │             │
//!                      SENT         FAILED
//!                        │             │
//!                        ▼             ▼
//!                  save + Verified  error, nothing saved
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::VerificationConfig;
use crate::error::{Error, Result};
use crate::event::{
    create_event_channel, VerificationEvent, VerificationEventsChannel, VerificationEventsSender,
};
use crate::storage::{KeyValueStore, PersistedVerification, VerificationRecord};
use crate::wallet::WalletSession;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of checking the cache for an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// A current verification exists; no payment needed.
    CachedAsVerified(VerificationRecord),
    /// No current verification; a payment is needed.
    VerificationRequired,
}

impl VerificationStatus {
    /// Returns true if gated content can be shown.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::CachedAsVerified(_))
    }
}

/// Decides whether a visitor is verified and drives the payment if not.
pub struct VerificationFlow {
    persisted: PersistedVerification,
    config: VerificationConfig,
    amount_wei: u128,
    validity: Duration,
    clock: Arc<dyn Clock>,
    events: VerificationEventsSender,
}

impl VerificationFlow {
    /// Create a flow over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured amount or validity window is invalid.
    pub fn new(store: Arc<dyn KeyValueStore>, config: VerificationConfig) -> Result<Self> {
        let amount_wei = config.amount_wei()?;
        let validity = config.validity()?;
        let (events, _) = create_event_channel();

        info!(
            "Verification flow initialized (amount={} wei, validity={}h, recipient={:?}, demo={})",
            amount_wei, config.validity_hours, config.recipient, config.demo_mode
        );

        Ok(Self {
            persisted: PersistedVerification::new(store),
            config,
            amount_wei,
            validity,
            clock: Arc::new(SystemClock),
            events,
        })
    }

    /// Use `clock` instead of wall-clock time.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Subscribe to flow events.
    #[must_use]
    pub fn subscribe(&self) -> VerificationEventsChannel {
        self.events.subscribe()
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// The validity window.
    #[must_use]
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// The fee in wei.
    #[must_use]
    pub fn amount_wei(&self) -> u128 {
        self.amount_wei
    }

    /// When `record` stops being honored.
    #[must_use]
    pub fn expires_at(&self, record: &VerificationRecord) -> DateTime<Utc> {
        record.expires_at(self.validity)
    }

    /// Return the owner's record if it is still within the validity window.
    ///
    /// Never fails: stale and corrupt entries are evicted and reported as
    /// absent, and storage read failures are logged and reported as absent.
    pub fn check_cached(&self, owner_address: &str) -> Option<VerificationRecord> {
        let record = match self.persisted.load(owner_address) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(Error::StorageCorrupt(reason)) => {
                warn!("Corrupt verification for {}: {}", owner_address, reason);
                self.evict(owner_address, format!("corrupt: {reason}"));
                return None;
            }
            Err(e) => {
                warn!("Failed to read verification for {}: {}", owner_address, e);
                return None;
            }
        };

        if record.is_current(self.clock.now(), self.validity) {
            debug!(
                "Cached verification for {} (tx {})",
                owner_address, record.transaction_hash
            );
            let _ = self.events.send(VerificationEvent::CacheHit {
                owner: owner_address.to_string(),
                transaction_hash: record.transaction_hash.clone(),
            });
            Some(record)
        } else {
            debug!("Verification for {} expired", owner_address);
            self.evict(owner_address, "expired".to_string());
            None
        }
    }

    /// Check the cache and report whether a payment is needed.
    #[must_use]
    pub fn status(&self, owner_address: &str) -> VerificationStatus {
        self.check_cached(owner_address)
            .map_or(VerificationStatus::VerificationRequired, |record| {
                VerificationStatus::CachedAsVerified(record)
            })
    }

    /// Send the verification payment and record it.
    ///
    /// Makes exactly one transfer attempt and never retries. On any failure
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// - [`Error::WalletNotConnected`] if `session` is `None`
    /// - [`Error::WrongNetwork`] if the session is on another chain
    /// - [`Error::TransactionRejected`] if the user declines
    /// - [`Error::TransactionFailed`] if the wallet reports a failure
    /// - a storage error if the record cannot be saved
    pub async fn verify(
        &self,
        session: Option<&WalletSession>,
        owner_address: &str,
    ) -> Result<VerificationRecord> {
        let result = self.send_and_record(session, owner_address).await;
        self.publish_outcome(owner_address, &result);
        result
    }

    async fn send_and_record(
        &self,
        session: Option<&WalletSession>,
        owner_address: &str,
    ) -> Result<VerificationRecord> {
        let session = session.ok_or(Error::WalletNotConnected)?;
        session.ensure_network()?;
        if !session.address().eq_ignore_ascii_case(owner_address) {
            warn!(
                "Verifying {} from wallet account {}",
                owner_address,
                session.address()
            );
        }

        let _ = self.events.send(VerificationEvent::Pending {
            owner: owner_address.to_string(),
        });

        let recipient = self.config.recipient_for(owner_address);
        info!(
            "Sending {} wei verification for {} to {}",
            self.amount_wei, owner_address, recipient
        );
        let transaction_hash = session.send_value(&recipient, self.amount_wei).await?;

        let record = VerificationRecord::new(owner_address, transaction_hash, self.clock.now());
        self.persisted.save(&record)?;
        Ok(record)
    }

    /// Record a verification without a wallet (demo mode).
    ///
    /// The transaction hash is derived from the owner and the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if demo mode is off, or a storage error.
    pub fn verify_simulated(&self, owner_address: &str) -> Result<VerificationRecord> {
        if !self.config.demo_mode {
            return Err(Error::Config("demo mode is disabled".to_string()));
        }

        let now = self.clock.now();
        let mut hasher = Sha256::new();
        hasher.update(owner_address.to_ascii_lowercase().as_bytes());
        hasher.update(now.timestamp_millis().to_be_bytes());
        let transaction_hash = format!("0x{}", hex::encode(hasher.finalize()));

        info!("Simulated verification for {}", owner_address);
        let record = VerificationRecord::new(owner_address, transaction_hash, now);
        let result = self.persisted.save(&record).map(|()| record);
        self.publish_outcome(owner_address, &result);
        result
    }

    /// Forget the owner's verification.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&self, owner_address: &str) -> Result<()> {
        self.persisted.clear(owner_address)?;
        let _ = self.events.send(VerificationEvent::CacheEvicted {
            owner: owner_address.to_string(),
            reason: "cleared".to_string(),
        });
        Ok(())
    }

    fn evict(&self, owner_address: &str, reason: String) {
        if let Err(e) = self.persisted.clear(owner_address) {
            warn!("Failed to evict verification for {}: {}", owner_address, e);
        }
        let _ = self.events.send(VerificationEvent::CacheEvicted {
            owner: owner_address.to_string(),
            reason,
        });
    }

    fn publish_outcome(&self, owner_address: &str, result: &Result<VerificationRecord>) {
        let event = match result {
            Ok(record) => {
                info!(
                    "Verified {} (tx {})",
                    owner_address, record.transaction_hash
                );
                VerificationEvent::Verified {
                    owner: owner_address.to_string(),
                    transaction_hash: record.transaction_hash.clone(),
                }
            }
            Err(e) => {
                warn!("Verification failed for {}: {}", owner_address, e);
                VerificationEvent::Failed {
                    owner: owner_address.to_string(),
                    message: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event);
    }
}
