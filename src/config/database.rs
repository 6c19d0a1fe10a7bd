//! Database configuration module for the card ledger.
//!
//! Handles the `SQLite` connection and creates the `kv_entries` table from its
//! `SeaORM` entity definition with `Schema::create_table_from_entity`, so the
//! schema always matches the Rust struct.

use crate::entities::KvEntry;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection, Schema};
use std::path::Path;

/// Default database location when `DATABASE_URL` is unset
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/card_ledger.sqlite?mode=rwc";

/// Gets the database URL from the environment, or the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the directory holding a file-backed `SQLite` database.
///
/// In-memory URLs and URLs without a directory part need nothing.
pub fn ensure_database_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Creates the key-value table if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut kv_table = schema.create_table_from_entity(KvEntry);
    kv_table.if_not_exists();

    db.execute(builder.build(&kv_table)).await?;
    Ok(())
}
