//! Per-origin persistence of verification records.
//!
//! Records live in a string key/value store with the same contract as a
//! browser's local storage: one JSON object per key, readable and writable by
//! whoever owns the origin. Two backends are provided:
//!
//! - [`MemoryStore`]: process-local, used for tests and one-shot runs
//! - [`FileStore`]: a directory on disk; each key is one JSON file
//!
//! Writes are last-writer-wins. Two processes sharing a [`FileStore`]
//! directory never see a torn file, but nothing orders their writes.

mod file;
mod record;

pub use file::FileStore;
pub use record::VerificationRecord;

use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Prefix of the storage key holding an owner's record.
pub const STORAGE_KEY_PREFIX: &str = "humanity_verified";

/// String key/value storage scoped to one origin.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory [`KeyValueStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.lock().remove(key);
        Ok(())
    }
}

/// Storage key for an owner's record.
#[must_use]
pub fn storage_key(owner_address: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}:{}", owner_address.to_ascii_lowercase())
}

/// Typed access to verification records on top of a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistedVerification {
    store: Arc<dyn KeyValueStore>,
}

impl PersistedVerification {
    /// Wrap a key/value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the record stored for `owner_address`.
    ///
    /// A record stored under the owner's key but naming a different owner is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StorageCorrupt`] if the slot holds malformed data,
    /// or a backend error if the store cannot be read.
    pub fn load(&self, owner_address: &str) -> Result<Option<VerificationRecord>> {
        let Some(raw) = self.store.get(&storage_key(owner_address))? else {
            return Ok(None);
        };
        let record = VerificationRecord::from_json(&raw)?;
        if record.is_owned_by(owner_address) {
            Ok(Some(record))
        } else {
            debug!(
                "Stored record for {} names owner {}; ignoring",
                owner_address, record.owner_address
            );
            Ok(None)
        }
    }

    /// Save a record, replacing any earlier record for the same owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or written.
    pub fn save(&self, record: &VerificationRecord) -> Result<()> {
        let raw = record.to_json()?;
        self.store.set(&storage_key(&record.owner_address), &raw)?;
        debug!(
            "Saved verification for {} (tx {})",
            record.owner_address, record.transaction_hash
        );
        Ok(())
    }

    /// Remove the record for `owner_address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear(&self, owner_address: &str) -> Result<()> {
        self.store.remove(&storage_key(owner_address))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::Utc;

    fn persisted() -> (MemoryStore, PersistedVerification) {
        let store = MemoryStore::new();
        let persisted = PersistedVerification::new(Arc::new(store.clone()));
        (store, persisted)
    }

    #[test]
    fn test_empty_store() {
        let (_, persisted) = persisted();
        assert!(persisted.load("0xABC").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let (store, persisted) = persisted();
        let record = VerificationRecord::new("0xABC", "0xHASH1", Utc::now());
        persisted.save(&record).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(persisted.load("0xabc").unwrap(), Some(record));
        assert!(persisted.load("0xDEF").unwrap().is_none());
    }

    #[test]
    fn test_newer_record_replaces_older() {
        let (store, persisted) = persisted();
        persisted
            .save(&VerificationRecord::new("0xABC", "0xOLD", Utc::now()))
            .unwrap();
        persisted
            .save(&VerificationRecord::new("0xAbc", "0xNEW", Utc::now()))
            .unwrap();

        assert_eq!(store.len(), 1);
        let loaded = persisted.load("0xABC").unwrap().unwrap();
        assert_eq!(loaded.transaction_hash, "0xNEW");
    }

    #[test]
    fn test_foreign_owner_in_slot_is_ignored() {
        let (store, persisted) = persisted();
        let foreign = VerificationRecord::new("0xDEF", "0xHASH", Utc::now());
        store
            .set(&storage_key("0xABC"), &foreign.to_json().unwrap())
            .unwrap();
        assert!(persisted.load("0xABC").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_slot_is_reported() {
        let (store, persisted) = persisted();
        store.set(&storage_key("0xABC"), "{not json").unwrap();

        assert!(matches!(
            persisted.load("0xABC"),
            Err(Error::StorageCorrupt(_))
        ));
        persisted.clear("0xABC").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear() {
        let (store, persisted) = persisted();
        persisted
            .save(&VerificationRecord::new("0xABC", "0xHASH1", Utc::now()))
            .unwrap();
        persisted.clear("0xABC").unwrap();
        persisted.clear("0xABC").unwrap();
        assert!(store.is_empty());
    }
}
