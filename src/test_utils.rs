//! Shared test utilities for the card ledger.
//!
//! Provides a bootstrapped in-memory ledger with a fixed cast of users, and
//! helpers for creating templates and consumer-held cards with sensible
//! defaults.

use crate::{
    config::Settings,
    core::{Caller, CardLedger, LedgerSettings},
    entities::{Role, Shop, TemplateFields, User},
    errors::Result,
    store::{LedgerStore, MemoryStore},
};

fn user(identity: &str, role: Role) -> User {
    User {
        identity: identity.to_string(),
        name: identity.to_string(),
        ecert: identity.to_string(),
        affiliation: role.affiliation(),
        auth_id: String::new(),
    }
}

fn shop(shop_id: &str, shop_name: &str) -> Shop {
    Shop {
        shop_id: shop_id.to_string(),
        shop_name: shop_name.to_string(),
        ..Shop::default()
    }
}

/// Settings seeding admin, shops S1 and S2, consumers C1 and C2, mailbox M1.
#[must_use]
pub fn test_settings() -> Settings {
    Settings {
        users: vec![
            user("S1", Role::Shop),
            user("S2", Role::Shop),
            user("C1", Role::Consumer),
            user("C2", Role::Consumer),
            user("M1", Role::Mailbox),
        ],
        shops: vec![shop("S1", "Corner Coffee"), shop("S2", "Night Market")],
        ..Settings::default()
    }
}

/// Memory-backed store without a multi-key `apply` of its own.
///
/// Commits go key by key through the trait's rollback path. Failing keys are
/// configured on the inner store.
#[derive(Debug, Default)]
pub struct SequentialStore {
    inner: MemoryStore,
}

impl SequentialStore {
    /// The backing memory store.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl LedgerStore for SequentialStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }
}

/// Ledger over `store`, bootstrapped with [`test_settings`].
pub async fn seeded_ledger_on<S: LedgerStore>(store: S) -> Result<CardLedger<S>> {
    let settings = test_settings();
    let mut ledger = CardLedger::new(store, LedgerSettings::from(&settings));
    ledger.bootstrap(&settings).await?;
    Ok(ledger)
}

/// In-memory ledger bootstrapped with [`test_settings`].
pub async fn seeded_ledger() -> Result<CardLedger<MemoryStore>> {
    seeded_ledger_on(MemoryStore::new()).await
}

/// The bootstrap administrator.
#[must_use]
pub fn admin() -> Caller {
    Caller::new("admin", Role::Authority)
}

/// A caller with the given identity and role.
#[must_use]
pub fn caller(id: &str, role: Role) -> Caller {
    Caller::new(id, role)
}

/// Complete template fields issued by `shop_id`.
///
/// # Defaults
/// * money: 100
/// * point: 50
/// * level, class, expiry date populated
#[must_use]
pub fn template_fields(shop_id: &str) -> TemplateFields {
    TemplateFields {
        issuer_shop_name: format!("Shop {shop_id}"),
        issuer_shop_id: shop_id.to_string(),
        category: "drinks".to_string(),
        level: "gold".to_string(),
        class: "stored-value".to_string(),
        money: 100,
        point: 50,
        expiry_date: "2030-12-31".to_string(),
        ..TemplateFields::default()
    }
}

/// Creates a complete template as the administrator.
pub async fn create_template<S: LedgerStore>(
    ledger: &mut CardLedger<S>,
    template_id: &str,
    shop_id: &str,
) -> Result<()> {
    ledger
        .create_template(&admin(), template_id, template_fields(shop_id))
        .await
}

/// Creates a template issued by `shop_id` and pushes one card to `owner`.
pub async fn consumer_card_from<S: LedgerStore>(
    ledger: &mut CardLedger<S>,
    template_id: &str,
    shop_id: &str,
    owner: &str,
) -> Result<String> {
    create_template(ledger, template_id, shop_id).await?;
    ledger
        .push_card(&caller(shop_id, Role::Shop), owner, template_id)
        .await
}

/// Card with money 100 and point 50 held by `owner`, issued by S1.
pub async fn consumer_card<S: LedgerStore>(
    ledger: &mut CardLedger<S>,
    template_id: &str,
    owner: &str,
) -> Result<String> {
    consumer_card_from(ledger, template_id, "S1", owner).await
}
