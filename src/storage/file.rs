//! Directory-backed key/value store.

use super::KeyValueStore;
use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A [`KeyValueStore`] where each key is a JSON file in one directory.
///
/// The directory plays the role of a browser origin. Values are written to a
/// temporary file in the same directory and renamed into place, so readers
/// see either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or is not a
    /// directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "storage path is not a directory: {}",
                dir.display()
            )));
        }
        debug!("Opened file store at {}", dir.display());
        Ok(Self { dir })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // Non-UTF-8 content is malformed data, not a backend failure.
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(Error::StorageCorrupt(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::{storage_key, PersistedVerification, VerificationRecord};
    use chrono::Utc;
    use std::sync::Arc;

    #[test]
    fn test_roundtrip_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("origin")).unwrap();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        let reopened = FileStore::open(store.dir()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v2"));

        reopened.remove("k").unwrap();
        reopened.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_key_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set(&storage_key("0xABC"), "{}").unwrap();
        assert!(dir.path().join("humanity_verified_0xabc.json").exists());
    }

    #[test]
    fn test_persisted_record_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let record = VerificationRecord::new("0xABC", "0xHASH1", Utc::now());
        {
            let store = FileStore::open(dir.path()).unwrap();
            PersistedVerification::new(Arc::new(store))
                .save(&record)
                .unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        let loaded = PersistedVerification::new(Arc::new(store))
            .load("0xABC")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.transaction_hash, "0xHASH1");
    }

    #[test]
    fn test_malformed_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("humanity_verified_0xabc.json"), [0xff, 0xfe]).unwrap();

        let persisted = PersistedVerification::new(Arc::new(store.clone()));
        assert!(matches!(
            persisted.load("0xABC"),
            Err(Error::StorageCorrupt(_))
        ));
        persisted.clear("0xABC").unwrap();
        assert!(store.get(&storage_key("0xABC")).unwrap().is_none());
    }
}
