//! Unit of work - Stages the writes of one operation and commits them together.
//!
//! Reads go through the staged overlay first, so an operation sees its own
//! writes before commit. Nothing reaches the store until [`UnitOfWork::commit`];
//! dropping an uncommitted unit discards every staged write.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{LedgerStore, WriteOp};
use crate::errors::{Error, Result};

/// Decodes a stored record, reporting the key on failure.
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::CorruptRecord {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Reads and decodes one record straight from the store.
pub async fn load_record<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: LedgerStore,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(bytes) => decode(key, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Staged writes of a single ledger operation
pub struct UnitOfWork<'a, S: LedgerStore> {
    store: &'a S,
    staged: BTreeMap<String, Option<Vec<u8>>>,
}

impl<'a, S: LedgerStore> UnitOfWork<'a, S> {
    /// Starts an empty unit against `store`.
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    /// Raw bytes under `key`, staged value first.
    pub async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get(key).await,
        }
    }

    /// Decoded record under `key`, staged value first.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(bytes) => decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// True when `key` holds a value, counting staged writes.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Stages `value` under `key`.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| Error::CorruptRecord {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.staged.insert(key.to_string(), Some(bytes));
        Ok(())
    }

    /// Stages removal of `key`.
    pub fn delete(&mut self, key: &str) {
        self.staged.insert(key.to_string(), None);
    }

    /// Number of staged writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// True when nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Hands every staged write to the store as one batch.
    pub async fn commit(self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let batch: Vec<WriteOp> = self
            .staged
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => WriteOp::Put { key, value },
                None => WriteOp::Delete { key },
            })
            .collect();
        debug!("Committing {} staged write(s)", batch.len());
        self.store.apply(batch).await
    }
}
