//! Display state derived from the verification flow.

use crate::chain::ChainConfig;
use crate::error::{Error, Result};
use crate::flow::VerificationFlow;
use crate::storage::VerificationRecord;
use crate::wallet::WalletSession;
use chrono::{DateTime, Utc};
use tracing::debug;

/// What the gate shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    /// Checking the cache.
    Loading,
    /// Prompting the visitor to verify.
    Unverified,
    /// Waiting for the wallet.
    Pending,
    /// Gated content is unlocked.
    Verified {
        /// The verification in effect.
        record: VerificationRecord,
        /// When it stops being honored.
        expires_at: DateTime<Utc>,
        /// Explorer link for the transaction.
        explorer_url: String,
    },
    /// The last attempt failed.
    Failed {
        /// Text to show the visitor.
        message: String,
    },
}

impl DisplayState {
    fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Unverified => "unverified",
            Self::Pending => "pending",
            Self::Verified { .. } => "verified",
            Self::Failed { .. } => "failed",
        }
    }

    /// Whether gated content can be shown.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }
}

/// State machine for one visitor's session.
///
/// `Loading -> {Verified | Unverified}`,
/// `Unverified -> Pending -> {Verified | Failed}`, `Failed -> Unverified`.
/// `Verified` is terminal; a fresh gate re-evaluates after expiry.
#[derive(Debug, Clone)]
pub struct Gate {
    state: DisplayState,
    chain: ChainConfig,
    validity: chrono::Duration,
}

impl Gate {
    /// A gate in the `Loading` state.
    #[must_use]
    pub fn new(chain: ChainConfig, validity: chrono::Duration) -> Self {
        Self {
            state: DisplayState::Loading,
            chain,
            validity,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Resolve the initial check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gate is `Loading`.
    pub fn mount(&mut self, cached: Option<VerificationRecord>) -> Result<&DisplayState> {
        self.expect(matches!(self.state, DisplayState::Loading), "mount")?;
        self.state = match cached {
            Some(record) => self.verified(record),
            None => DisplayState::Unverified,
        };
        Ok(&self.state)
    }

    /// The visitor asked to verify.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gate is `Unverified`.
    pub fn begin(&mut self) -> Result<&DisplayState> {
        self.expect(matches!(self.state, DisplayState::Unverified), "begin")?;
        self.state = DisplayState::Pending;
        Ok(&self.state)
    }

    /// The payment was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gate is `Pending`.
    pub fn succeed(&mut self, record: VerificationRecord) -> Result<&DisplayState> {
        self.expect(matches!(self.state, DisplayState::Pending), "succeed")?;
        self.state = self.verified(record);
        Ok(&self.state)
    }

    /// The payment failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gate is `Pending`.
    pub fn fail(&mut self, error: &Error) -> Result<&DisplayState> {
        self.expect(matches!(self.state, DisplayState::Pending), "fail")?;
        self.state = DisplayState::Failed {
            message: error.to_string(),
        };
        Ok(&self.state)
    }

    /// Go back to the prompt after a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gate is `Failed`.
    pub fn retry(&mut self) -> Result<&DisplayState> {
        self.expect(matches!(self.state, DisplayState::Failed { .. }), "retry")?;
        self.state = DisplayState::Unverified;
        Ok(&self.state)
    }

    /// Mount from the flow's cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the gate is `Loading`.
    pub fn mount_from(
        &mut self,
        flow: &VerificationFlow,
        owner_address: &str,
    ) -> Result<&DisplayState> {
        let cached = flow.check_cached(owner_address);
        self.mount(cached)
    }

    /// Run one verification attempt through the flow.
    ///
    /// A `Failed` gate is moved back to `Unverified` first. Flow errors end
    /// in the `Failed` state and are not returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the gate is `Loading`,
    /// `Pending` or already `Verified`.
    pub async fn attempt(
        &mut self,
        flow: &VerificationFlow,
        session: Option<&WalletSession>,
        owner_address: &str,
    ) -> Result<&DisplayState> {
        if matches!(self.state, DisplayState::Failed { .. }) {
            self.retry()?;
        }
        self.begin()?;
        match flow.verify(session, owner_address).await {
            Ok(record) => self.succeed(record),
            Err(e) => self.fail(&e),
        }
    }

    fn verified(&self, record: VerificationRecord) -> DisplayState {
        DisplayState::Verified {
            expires_at: record.expires_at(self.validity),
            explorer_url: self.chain.tx_url(&record.transaction_hash),
            record,
        }
    }

    fn expect(&self, allowed: bool, event: &'static str) -> Result<()> {
        if allowed {
            debug!("Gate {} on {}", self.state.name(), event);
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.state.name(),
                event,
            })
        }
    }
}

/// Abbreviate an address as `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn gate() -> Gate {
        Gate::new(ChainConfig::base_sepolia(), Duration::hours(24))
    }

    fn record() -> VerificationRecord {
        VerificationRecord::new("0xABC", "0xHASH1", Utc::now())
    }

    #[test]
    fn test_mount_cached() {
        let mut gate = gate();
        let rec = record();
        let state = gate.mount(Some(rec.clone())).unwrap();
        match state {
            DisplayState::Verified {
                record,
                expires_at,
                explorer_url,
            } => {
                assert_eq!(record, &rec);
                assert_eq!(*expires_at, rec.timestamp + Duration::hours(24));
                assert_eq!(explorer_url, "https://sepolia.basescan.org/tx/0xHASH1");
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(gate.state().is_unlocked());
        assert!(gate.begin().is_err());
    }

    #[test]
    fn test_mount_with_huge_window() {
        let huge = Duration::try_hours(10_000_000_000).unwrap();
        let mut gate = Gate::new(ChainConfig::base_sepolia(), huge);
        match gate.mount(Some(record())).unwrap() {
            DisplayState::Verified { expires_at, .. } => {
                assert_eq!(*expires_at, DateTime::<Utc>::MAX_UTC);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_failure_and_retry() {
        let mut gate = gate();
        gate.mount(None).unwrap();
        assert_eq!(gate.state(), &DisplayState::Unverified);

        gate.begin().unwrap();
        let state = gate
            .fail(&Error::TransactionRejected("User denied".to_string()))
            .unwrap();
        assert_eq!(
            state,
            &DisplayState::Failed {
                message: "Transaction rejected: User denied".to_string()
            }
        );

        gate.retry().unwrap();
        gate.begin().unwrap();
        gate.succeed(record()).unwrap();
        assert!(gate.state().is_unlocked());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut gate = gate();
        assert!(matches!(
            gate.begin(),
            Err(Error::InvalidTransition {
                from: "loading",
                event: "begin"
            })
        ));
        gate.mount(None).unwrap();
        assert!(gate.mount(None).is_err());
        assert!(gate.succeed(record()).is_err());
        assert!(gate.retry().is_err());
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("0x1234567890abcdef1234567890abcdef12345678"),
            "0x1234...5678"
        );
        assert_eq!(short_address("0xABC"), "0xABC");
    }
}
