//! Key-value entry entity - Backing table of the `SQLite` ledger store.
//!
//! The ledger store is a flat key/value space; every record (cards, ledgers,
//! directory entries, registries) is one row keyed by its store key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Key-value database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kv_entries")]
pub struct Model {
    /// Store key
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Serialized record bytes
    pub value: Vec<u8>,
    /// When the entry was last written
    pub updated_at: DateTimeUtc,
}

/// `KvEntry` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
