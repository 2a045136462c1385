//! # captchafree
//!
//! Skip the CAPTCHA by proving you are willing to pay for it: a visitor sends
//! a small native-currency transaction from their wallet, and the result is
//! remembered for a validity window.
//!
//! ## Components
//!
//! - [`wallet`]: the external wallet connector boundary and [`WalletSession`]
//! - [`flow`]: [`VerificationFlow`], cached check then one payment
//! - [`storage`]: per-origin persistence of [`VerificationRecord`]s
//! - [`display`]: [`DisplayState`] and the [`Gate`] state machine
//!
//! ## Example
//!
//! ```rust,ignore
//! use captchafree::{
//!     ChainConfig, FileStore, Gate, HttpProvider, HttpProviderConfig, VerificationConfig,
//!     VerificationFlow, WalletSession,
//! };
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileStore::open("/tmp/captchafree")?);
//! let flow = VerificationFlow::new(store, VerificationConfig::default())?;
//!
//! let provider = Arc::new(HttpProvider::new(HttpProviderConfig::default())?);
//! let session = WalletSession::connect(provider, ChainConfig::base_sepolia()).await?;
//!
//! let mut gate = Gate::new(ChainConfig::base_sepolia(), flow.validity());
//! gate.mount_from(&flow, session.address())?;
//! if !gate.state().is_unlocked() {
//!     gate.attempt(&flow, Some(&session), session.address()).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod flow;
pub mod storage;
pub mod wallet;

pub use chain::ChainConfig;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, Recipient, VerificationConfig, SENTINEL_ADDRESS};
pub use display::{short_address, DisplayState, Gate};
pub use error::{Error, Result};
pub use event::{VerificationEvent, VerificationEventsChannel};
pub use flow::{VerificationFlow, VerificationStatus};
pub use storage::{FileStore, KeyValueStore, MemoryStore, PersistedVerification, VerificationRecord};
pub use wallet::{HttpProvider, HttpProviderConfig, ProviderError, WalletProvider, WalletSession};
