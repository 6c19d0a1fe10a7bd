//! Registry index - Enumerable id lists kept beside the authoritative records.
//!
//! Each registry is a single document `{ "<field>": [id, ...] }`. Registries
//! only serve "list all" queries; every id is resolved against its own record
//! on read. Older documents that stored whole serialized records instead of ids
//! are read by pulling the id field out of each entry.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::keys::{CARD_REGISTRY, SHOP_REGISTRY, TEMPLATE_REGISTRY, USER_REGISTRY};
use crate::errors::{Error, Result};
use crate::store::{LedgerStore, UnitOfWork};

/// One registry document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registry {
    key: &'static str,
    field: &'static str,
    id_field: &'static str,
}

/// Registered users
pub const USERS: Registry = Registry {
    key: USER_REGISTRY,
    field: "users",
    id_field: "identity",
};

/// Registered shops
pub const SHOPS: Registry = Registry {
    key: SHOP_REGISTRY,
    field: "shops",
    id_field: "shopid",
};

/// Card templates
pub const TEMPLATES: Registry = Registry {
    key: TEMPLATE_REGISTRY,
    field: "cards",
    id_field: "kakaid",
};

/// Issued card instances
pub const CARDS: Registry = Registry {
    key: CARD_REGISTRY,
    field: "cards",
    id_field: "cardid",
};

/// Every registry, for bootstrap.
pub const ALL: [Registry; 4] = [USERS, SHOPS, TEMPLATES, CARDS];

impl Registry {
    /// Store key of the registry document.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Ids in insertion order. A missing document or `null` list is empty.
    pub async fn ids<S: LedgerStore>(&self, uow: &UnitOfWork<'_, S>) -> Result<Vec<String>> {
        let Some(document) = uow.load::<Value>(self.key).await? else {
            return Ok(Vec::new());
        };
        let entries = match document.get(self.field) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(self.corrupt(format!("'{}' is not a list", self.field))),
        };
        entries.iter().map(|entry| self.entry_id(entry)).collect()
    }

    fn entry_id(&self, entry: &Value) -> Result<String> {
        match entry {
            Value::String(id) => Ok(id.clone()),
            Value::Object(record) => record
                .get(self.id_field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| self.corrupt(format!("entry without '{}'", self.id_field))),
            other => Err(self.corrupt(format!("unexpected entry {other}"))),
        }
    }

    fn corrupt(&self, message: String) -> Error {
        Error::CorruptRecord {
            key: self.key.to_string(),
            message,
        }
    }

    fn write<S: LedgerStore>(&self, uow: &mut UnitOfWork<'_, S>, ids: Vec<String>) -> Result<()> {
        let mut document = Map::new();
        document.insert(
            self.field.to_string(),
            Value::Array(ids.into_iter().map(Value::String).collect()),
        );
        uow.put(self.key, &Value::Object(document))
    }

    /// Creates an empty document when none exists.
    pub async fn ensure<S: LedgerStore>(&self, uow: &mut UnitOfWork<'_, S>) -> Result<()> {
        if !uow.exists(self.key).await? {
            self.write(uow, Vec::new())?;
        }
        Ok(())
    }

    /// Appends ids not already listed.
    pub async fn append<S, I>(&self, uow: &mut UnitOfWork<'_, S>, new_ids: I) -> Result<()>
    where
        S: LedgerStore,
        I: IntoIterator<Item = String>,
    {
        let mut ids = self.ids(uow).await?;
        let mut listed: HashSet<String> = ids.iter().cloned().collect();
        for id in new_ids {
            if listed.insert(id.clone()) {
                ids.push(id);
            }
        }
        self.write(uow, ids)
    }

    /// Drops `id` from the list.
    pub async fn remove<S: LedgerStore>(&self, uow: &mut UnitOfWork<'_, S>, id: &str) -> Result<()> {
        let mut ids = self.ids(uow).await?;
        ids.retain(|existing| existing != id);
        self.write(uow, ids)
    }

    /// Replaces `old` with `new` in place, keeping its position.
    pub async fn rename<S: LedgerStore>(
        &self,
        uow: &mut UnitOfWork<'_, S>,
        old: &str,
        new: &str,
    ) -> Result<()> {
        let mut ids = self.ids(uow).await?;
        match ids.iter().position(|existing| existing == old) {
            Some(index) => ids[index] = new.to_string(),
            None => ids.push(new.to_string()),
        }
        self.write(uow, ids)
    }
}
