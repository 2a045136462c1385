//! Verification event system.

use tokio::sync::broadcast;

/// Events emitted by the verification flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEvent {
    /// A current cached verification was found.
    CacheHit {
        /// Owner address.
        owner: String,
        /// Cached transaction hash.
        transaction_hash: String,
    },

    /// A cached verification was dropped.
    CacheEvicted {
        /// Owner address.
        owner: String,
        /// Why it was dropped.
        reason: String,
    },

    /// A verification transaction is awaiting the wallet.
    Pending {
        /// Owner address.
        owner: String,
    },

    /// Verification succeeded and was recorded.
    Verified {
        /// Owner address.
        owner: String,
        /// Transaction hash.
        transaction_hash: String,
    },

    /// Verification failed; nothing was recorded.
    Failed {
        /// Owner address.
        owner: String,
        /// Error message.
        message: String,
    },
}

/// Channel for receiving verification events.
pub type VerificationEventsChannel = broadcast::Receiver<VerificationEvent>;

/// Sender for verification events.
pub type VerificationEventsSender = broadcast::Sender<VerificationEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (VerificationEventsSender, VerificationEventsChannel) {
    broadcast::channel(256)
}
