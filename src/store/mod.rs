//! Ledger store - The key-value collaborator every record lives in.
//!
//! The contract is deliberately small: `get`, `put`, and `delete` on single keys,
//! with no range queries and no secondary indexes. Operations that touch several
//! keys stage their writes in a [`UnitOfWork`] and hand them to [`LedgerStore::apply`]
//! in one step. Stores that can commit several keys atomically override `apply`;
//! the provided implementation writes key by key and restores earlier writes if a
//! later one fails.

pub mod memory;
pub mod sqlite;
pub mod unit_of_work;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use unit_of_work::UnitOfWork;

use crate::errors::{Error, Result};
use tracing::{debug, error, warn};

/// One staged write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    /// Store `value` under `key`
    Put {
        /// Target key
        key: String,
        /// Serialized record
        value: Vec<u8>,
    },
    /// Remove `key`
    Delete {
        /// Target key
        key: String,
    },
}

impl WriteOp {
    /// Key this write targets.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Key-value store holding the ledger's records.
#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    /// Reads the value under `key`, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Applies a batch of writes as one step.
    ///
    /// # Errors
    /// Returns the first write failure once every earlier write has been undone,
    /// or [`Error::Inconsistent`] naming the keys that could not be restored.
    async fn apply(&self, batch: Vec<WriteOp>) -> Result<()> {
        apply_with_rollback(self, batch).await
    }
}

/// Sequential commit with compensation, for stores without multi-key transactions.
///
/// Each key's previous value is read before it is overwritten. When a write
/// fails, the keys already written are restored newest first.
pub async fn apply_with_rollback<S>(store: &S, batch: Vec<WriteOp>) -> Result<()>
where
    S: LedgerStore + ?Sized,
{
    let mut undo: Vec<(String, Option<Vec<u8>>)> = Vec::with_capacity(batch.len());
    let mut failure = None;

    for op in batch {
        let previous = match store.get(op.key()).await {
            Ok(previous) => previous,
            Err(e) => {
                failure = Some(e);
                break;
            }
        };
        let key = op.key().to_string();
        let written = match op {
            WriteOp::Put { key, value } => store.put(&key, value).await,
            WriteOp::Delete { key } => store.delete(&key).await,
        };
        match written {
            Ok(()) => undo.push((key, previous)),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let Some(cause) = failure else {
        return Ok(());
    };

    warn!(
        "Commit failed after {} write(s), rolling back: {}",
        undo.len(),
        cause
    );

    let mut torn = Vec::new();
    for (key, previous) in undo.into_iter().rev() {
        let restored = match previous {
            Some(value) => store.put(&key, value).await,
            None => store.delete(&key).await,
        };
        match restored {
            Ok(()) => debug!("Restored key '{}'", key),
            Err(e) => {
                error!("Could not restore key '{}': {}", key, e);
                torn.push(key);
            }
        }
    }

    if torn.is_empty() {
        Err(cause)
    } else {
        Err(Error::Inconsistent { keys: torn })
    }
}
