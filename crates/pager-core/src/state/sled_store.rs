use crate::{error::StateStoreError, state::StateBackend};
use std::path::Path;

/// On-disk backend. Pager records survive restarts.
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| StateStoreError::Open(format!("{}: {e}", path.display())))?;
        Ok(Self { db })
    }
}

impl StateBackend for SledBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StateStoreError> {
        match self.db.get(key)? {
            // Non-UTF-8 bytes are handed up as-is and fail record parsing,
            // which discards the entry.
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StateStoreError> {
        self.db.insert(key, value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StateStoreError> {
        self.db.remove(key)?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StateStoreError> {
        let mut keys = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (key, _value) = item?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}
