// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON-file backed store.
//!
//! The whole map is loaded once and written through on every change. One
//! process owns the file; concurrent writers from other processes are not
//! coordinated.

use super::{KeyValueStore, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened session store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| StoreError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        // Replace atomically via rename.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());

        // Memory only changes once the file has.
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);

        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConsentDecision, Coordinate};
    use crate::store::SessionStore;
    use std::sync::Arc;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.set("access_token", "abc").unwrap();
        store.set("visitor_id", "v-1").unwrap();
        store.remove("visitor_id").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("access_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("visitor_id").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("state");
        fs::create_dir(&sub).unwrap();

        let store = FileStore::open(sub.join("session.json")).unwrap();
        store.set("access_token", "old").unwrap();
        fs::remove_dir_all(&sub).unwrap();

        assert!(store.set("access_token", "new").is_err());
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("old"));

        assert!(store.remove("access_token").is_err());
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("old"));

        assert!(store.set("visitor_id", "v-1").is_err());
        assert_eq!(store.get("visitor_id").unwrap(), None);
    }

    #[test]
    fn location_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let session = SessionStore::new(Arc::new(FileStore::open(&path).unwrap()));
        session
            .store_consent_decision(ConsentDecision::Granted)
            .unwrap();
        session
            .store_last_location(Coordinate::new(52.520_08, 13.404_954))
            .unwrap();
        drop(session);

        let reopened = SessionStore::new(Arc::new(FileStore::open(&path).unwrap()));
        assert_eq!(
            reopened.consent_decision().unwrap(),
            Some(ConsentDecision::Granted)
        );
        assert_eq!(
            reopened.last_location().unwrap(),
            Some(Coordinate::new(52.5201, 13.405))
        );
    }
}
