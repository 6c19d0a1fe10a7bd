//! Shop ledger accounting.
//!
//! Counters on a [`ShopLedger`] only grow. Each `record_*` method validates the
//! whole update before touching any field, so a rejected update leaves the
//! ledger exactly as it was.

use tracing::warn;

use super::keys::ledger_key;
use super::{Caller, CardLedger};
use crate::entities::{Role, ShopLedger};
use crate::errors::{Error, Result};
use crate::store::{LedgerStore, UnitOfWork};

fn add_count(total: u64, amount: u64, what: &str) -> Result<u64> {
    total
        .checked_add(amount)
        .ok_or_else(|| Error::invalid(format!("{what} counter overflow")))
}

fn add_amount(total: i64, amount: i64, what: &str) -> Result<i64> {
    if amount < 0 {
        return Err(Error::invalid(format!("{what} must not be negative")));
    }
    total
        .checked_add(amount)
        .ok_or_else(|| Error::invalid(format!("{what} total overflow")))
}

impl ShopLedger {
    /// Zeroed ledger for `template_id`, registered to `shop_id`.
    pub fn new(shop_id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into(),
            template_id: template_id.into(),
            ..Self::default()
        }
    }

    /// Index the next single issuance will use.
    pub fn next_card_index(&self) -> Result<u64> {
        add_count(self.card_index, 1, "card index")
    }

    /// Accounts for `count` cards issued with the given per-card grant.
    pub fn record_issuance(&mut self, count: u64, unit_money: i64, unit_point: i64) -> Result<()> {
        let scale = |unit: i64, what: &str| {
            i64::try_from(count)
                .ok()
                .and_then(|n| n.checked_mul(unit))
                .ok_or_else(|| Error::invalid(format!("{what} grant overflow")))
        };
        let card_index = add_count(self.card_index, count, "card index")?;
        let quantity = add_count(self.quantity, count, "quantity")?;
        let init_money = add_amount(self.init_money, scale(unit_money, "money")?, "money grant")?;
        let init_point = add_amount(self.init_point, scale(unit_point, "point")?, "point grant")?;

        self.card_index = card_index;
        self.quantity = quantity;
        self.init_money = init_money;
        self.init_point = init_point;
        Ok(())
    }

    /// Accounts for a shop deposit onto one of its cards.
    pub fn record_deposit(&mut self, money: i64, point: i64) -> Result<()> {
        let deposit_money = add_amount(self.deposit_money, money, "deposit money")?;
        let deposit_point = add_amount(self.deposit_point, point, "deposit point")?;
        self.deposit_money = deposit_money;
        self.deposit_point = deposit_point;
        Ok(())
    }

    /// Accounts for a consumer spending at the shop.
    pub fn record_consumption(&mut self, money: i64, point: i64) -> Result<()> {
        let consume_money = add_amount(self.consume_money, money, "consumed money")?;
        let consume_point = add_amount(self.consume_point, point, "consumed point")?;
        self.consume_money = consume_money;
        self.consume_point = consume_point;
        Ok(())
    }

    /// One card scrapped.
    pub fn record_scrap(&mut self) -> Result<()> {
        self.scrapped_count = add_count(self.scrapped_count, 1, "scrap")?;
        Ok(())
    }

    /// One card marked expired.
    pub fn record_expiry(&mut self) -> Result<()> {
        self.expired_count = add_count(self.expired_count, 1, "expiry")?;
        Ok(())
    }

    /// One card handed back to the issuing shop.
    pub fn record_return(&mut self) -> Result<()> {
        self.returned_count = add_count(self.returned_count, 1, "return")?;
        Ok(())
    }
}

/// Ledger for `template_id`, or a zeroed one registered to `shop_id`.
///
/// Nothing is written; the caller stages the ledger once it has been updated.
pub async fn ensure_ledger<S: LedgerStore>(
    uow: &UnitOfWork<'_, S>,
    shop_id: &str,
    template_id: &str,
) -> Result<ShopLedger> {
    match uow.load::<ShopLedger>(&ledger_key(template_id)).await? {
        Some(ledger) if ledger.shop_id == shop_id => Ok(ledger),
        Some(ledger) => {
            warn!(
                "Ledger for '{}' belongs to '{}', not '{}'",
                template_id, ledger.shop_id, shop_id
            );
            Err(Error::denied(
                "ensure shop ledger",
                format!("ledger for {template_id} is registered to another shop"),
            ))
        }
        None => Ok(ShopLedger::new(shop_id, template_id)),
    }
}

/// Existing ledger for `template_id`, `None` before its first issuance.
pub async fn load_ledger<S: LedgerStore>(
    uow: &UnitOfWork<'_, S>,
    template_id: &str,
) -> Result<Option<ShopLedger>> {
    uow.load(&ledger_key(template_id)).await
}

/// Stages `ledger` under its template key.
pub fn stage_ledger<S: LedgerStore>(uow: &mut UnitOfWork<'_, S>, ledger: &ShopLedger) -> Result<()> {
    uow.put(&ledger_key(&ledger.template_id), ledger)
}

impl<S: LedgerStore> CardLedger<S> {
    /// Reads the ledger `shop_id` keeps for `template_id`.
    ///
    /// The authority may read any ledger; a shop only its own.
    pub async fn get_shop_ledger(
        &self,
        caller: &Caller,
        shop_id: &str,
        template_id: &str,
    ) -> Result<ShopLedger> {
        let allowed = match caller.role {
            Role::Authority => true,
            Role::Shop => caller.id == shop_id,
            Role::Consumer | Role::Mailbox => false,
        };
        if !allowed {
            warn!("{} may not read the ledger of {}", caller.id, shop_id);
            return Err(Error::denied(
                "get_shopLedger",
                "only the authority or the ledger's shop may read it",
            ));
        }
        let uow = UnitOfWork::new(self.store());
        match load_ledger(&uow, template_id).await? {
            Some(ledger) if ledger.shop_id == shop_id => Ok(ledger),
            _ => Err(Error::not_found(
                "shop ledger",
                format!("{shop_id}/{template_id}"),
            )),
        }
    }
}
