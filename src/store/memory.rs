//! In-memory ledger store.
//!
//! Backed by a `BTreeMap` behind a mutex. `apply` holds the lock for the whole
//! batch, so a commit is all-or-nothing. Individual keys can be marked as
//! failing to exercise storage-error paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{LedgerStore, WriteOp};
use crate::errors::{Error, Result};

/// Process-local key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_keys: Mutex<BTreeSet<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| Error::StorageFailure {
        message: "memory store lock poisoned".to_string(),
    })
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later write to `key` fail with [`Error::StorageFailure`].
    pub fn fail_writes_to(&self, key: &str) -> Result<()> {
        lock(&self.failing_keys)?.insert(key.to_string());
        Ok(())
    }

    /// Copy of every entry, for before/after comparisons.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        Ok(lock(&self.entries)?.clone())
    }

    /// Number of stored keys.
    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.entries)?.len())
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(lock(&self.entries)?.is_empty())
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if lock(&self.failing_keys)?.contains(key) {
            return Err(Error::StorageFailure {
                message: format!("write to '{key}' rejected"),
            });
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.check_writable(key)?;
        lock(&self.entries)?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        lock(&self.entries)?.remove(key);
        Ok(())
    }

    async fn apply(&self, batch: Vec<WriteOp>) -> Result<()> {
        for op in &batch {
            self.check_writable(op.key())?;
        }
        let mut entries = lock(&self.entries)?;
        for op in batch {
            match op {
                WriteOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() -> Result<()> {
        let store = MemoryStore::new();
        assert!(store.is_empty()?);
        store.put("k", b"v".to_vec()).await?;
        assert_eq!(store.get("k").await?, Some(b"v".to_vec()));
        store.delete("k").await?;
        assert_eq!(store.get("k").await?, None);
        store.delete("never-there").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_is_all_or_nothing() -> Result<()> {
        let store = MemoryStore::new();
        store.put("a", b"1".to_vec()).await?;
        store.fail_writes_to("b")?;
        let before = store.snapshot()?;

        let result = store
            .apply(vec![
                WriteOp::Put {
                    key: "a".to_string(),
                    value: b"2".to_vec(),
                },
                WriteOp::Put {
                    key: "b".to_string(),
                    value: b"3".to_vec(),
                },
            ])
            .await;

        assert!(matches!(result, Err(Error::StorageFailure { .. })));
        assert_eq!(store.snapshot()?, before);
        Ok(())
    }
}
