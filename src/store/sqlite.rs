//! `SQLite` ledger store built on `SeaORM`.
//!
//! Every key is one row of the `kv_entries` table. `apply` runs the whole batch
//! inside a database transaction, so a failed commit leaves no partial writes.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use tracing::debug;

use super::{LedgerStore, WriteOp};
use crate::config::database::create_tables;
use crate::entities::{KvEntry, KvEntryColumn, kv_entry};
use crate::errors::Result;

/// Ledger store persisted in an `SQLite` database
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    /// Wraps an open connection. The `kv_entries` table must already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens `database_url` and creates the backing table when missing.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = Database::connect(database_url).await?;
        create_tables(&db).await?;
        debug!("Opened ledger store at {}", database_url);
        Ok(Self::new(db))
    }

    /// Underlying `SeaORM` connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

async fn upsert<C: ConnectionTrait>(conn: &C, key: &str, value: Vec<u8>) -> Result<()> {
    let entry = kv_entry::ActiveModel {
        key: Set(key.to_owned()),
        value: Set(value),
        updated_at: Set(Utc::now()),
    };
    KvEntry::insert(entry)
        .on_conflict(
            OnConflict::column(KvEntryColumn::Key)
                .update_columns([KvEntryColumn::Value, KvEntryColumn::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn remove<C: ConnectionTrait>(conn: &C, key: &str) -> Result<()> {
    KvEntry::delete_by_id(key.to_owned()).exec(conn).await?;
    Ok(())
}

impl LedgerStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entry = KvEntry::find_by_id(key.to_owned()).one(&self.db).await?;
        Ok(entry.map(|e| e.value))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        upsert(&self.db, key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        remove(&self.db, key).await
    }

    async fn apply(&self, batch: Vec<WriteOp>) -> Result<()> {
        // Dropping the transaction without commit rolls it back
        let txn = self.db.begin().await?;
        for op in batch {
            match op {
                WriteOp::Put { key, value } => upsert(&txn, &key, value).await?,
                WriteOp::Delete { key } => remove(&txn, &key).await?,
            }
        }
        txn.commit().await?;
        Ok(())
    }
}
