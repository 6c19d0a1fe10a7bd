//! Core business logic - the card state machine and shop ledger accounting.
//!
//! [`CardLedger`] owns the injected store and exposes every ledger operation as
//! a method. Mutating operations take `&mut self`, so one handle runs one
//! operation at a time; each stages its writes in a unit of work and commits
//! them together.

/// Shop ledger counters and lookups
pub mod accounting;
/// Money and point movement between cards, shops, and consumers
pub mod balance;
/// Card transfers, retirement, field updates, and card queries
pub mod cards;
/// Ledger timestamps
pub mod clock;
/// Users, shops, role lookup, and bootstrap
pub mod directory;
/// Template creation and card issuance
pub mod issuance;
/// Store key layout and id rules
pub mod keys;
/// Pure transition and field-update guards
pub mod lifecycle;
/// Registry index documents
pub mod registry;

pub use balance::Amounts;
pub use lifecycle::{CardField, Transfer};

use crate::config::Settings;
use crate::entities::Role;
use crate::store::LedgerStore;

/// A resolved, registered caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    /// Caller identity
    pub id: String,
    /// Role from the caller's directory record
    pub role: Role,
}

impl Caller {
    /// Builds a caller from an identity and role.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Tunables of the ledger engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Largest batch `create_batch_card_by_template` accepts
    pub max_batch_size: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 10_000,
        }
    }
}

impl From<&Settings> for LedgerSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            max_batch_size: settings.issuance.max_batch_size,
        }
    }
}

/// Card and shop ledger engine over a key-value store.
#[derive(Debug)]
pub struct CardLedger<S: LedgerStore> {
    store: S,
    settings: LedgerSettings,
}

impl<S: LedgerStore> CardLedger<S> {
    /// Creates a ledger over `store`.
    pub const fn new(store: S, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Engine settings.
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }
}
