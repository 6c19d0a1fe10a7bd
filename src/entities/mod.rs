//! Entity module - Records kept on the ledger and the table that stores them.
//!
//! `Card`, `ShopLedger`, `User`, and `Shop` are serialized into the key-value
//! store. `kv_entry` is the `SeaORM` entity backing the `SQLite` store.

pub mod card;
pub mod kv_entry;
pub mod shop;
pub mod shop_ledger;
pub mod user;

pub use card::{Card, CardStatus, TemplateFields};
pub use kv_entry::{Column as KvEntryColumn, Entity as KvEntry, Model as KvEntryModel};
pub use shop::Shop;
pub use shop_ledger::ShopLedger;
pub use user::{Role, User};
