//! Money and point movement.
//!
//! Peer transfers move balance between two consumer cards of the same issuer.
//! Deposits credit a card from its issuing shop; spends debit a card in favour
//! of that shop. Deposits and spends update the template's shop ledger in the
//! same unit of work as the card.

use tracing::{info, warn};

use super::accounting::{load_ledger, stage_ledger};
use super::cards::load_card;
use super::keys::card_key;
use super::lifecycle::{check_active, check_owner, check_role, check_status};
use super::{Caller, CardLedger};
use crate::entities::{Card, CardStatus, Role, ShopLedger};
use crate::errors::{Error, Result};
use crate::store::{LedgerStore, UnitOfWork};

/// Parses a non-negative integer amount.
pub fn parse_amount(what: &str, raw: &str) -> Result<i64> {
    let amount: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::invalid(format!("{what} '{raw}' is not an integer")))?;
    if amount < 0 {
        return Err(Error::invalid(format!("{what} must not be negative, got {amount}")));
    }
    Ok(amount)
}

/// Money and point moved by one operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Amounts {
    /// Money amount
    pub money: i64,
    /// Point amount
    pub point: i64,
}

impl Amounts {
    /// Validates a pair of amounts: neither negative, not both zero.
    pub fn new(money: i64, point: i64) -> Result<Self> {
        if money < 0 || point < 0 {
            return Err(Error::invalid("amounts must not be negative"));
        }
        if money == 0 && point == 0 {
            return Err(Error::invalid("money and point are both zero"));
        }
        Ok(Self { money, point })
    }

    /// Parses the string forms passed on the command line.
    pub fn parse(money: &str, point: &str) -> Result<Self> {
        Self::new(parse_amount("money", money)?, parse_amount("point", point)?)
    }

    /// Takes these amounts off `card`, refusing to go below zero.
    pub fn debit(self, card: &mut Card) -> Result<()> {
        if card.money < self.money || card.point < self.point {
            warn!(
                "Insufficient funds on '{}': has {}/{}, needs {}/{}",
                card.card_id, card.money, card.point, self.money, self.point
            );
            return Err(Error::InsufficientFunds {
                card_id: card.card_id.clone(),
                money: card.money,
                point: card.point,
                needed_money: self.money,
                needed_point: self.point,
            });
        }
        card.money -= self.money;
        card.point -= self.point;
        Ok(())
    }

    /// Adds these amounts to `card`.
    pub fn credit(self, card: &mut Card) -> Result<()> {
        let money = card
            .money
            .checked_add(self.money)
            .ok_or_else(|| Error::invalid("money balance overflow"))?;
        let point = card
            .point
            .checked_add(self.point)
            .ok_or_else(|| Error::invalid("point balance overflow"))?;
        card.money = money;
        card.point = point;
        Ok(())
    }
}

fn check_holding(action: &'static str, card: &Card) -> Result<()> {
    check_active(action, card)?;
    check_status(action, card, CardStatus::AtConsumer)
}

impl<S: LedgerStore> CardLedger<S> {
    /// Moves `amounts` from the caller's card to the receiver's card.
    pub async fn transfer_balance(
        &mut self,
        caller: &Caller,
        amounts: Amounts,
        source_id: &str,
        receiver: &str,
        target_id: &str,
    ) -> Result<()> {
        const ACTION: &str = "transfer_mp_consumer_to_consumer";
        check_role(ACTION, caller, Role::Consumer)?;
        if source_id == target_id {
            return Err(Error::invalid("source and target card are the same"));
        }
        let mut uow = UnitOfWork::new(self.store());
        let mut source = load_card(&uow, source_id).await?;
        let mut target = load_card(&uow, target_id).await?;
        let receiver_caller = Caller::new(receiver, self.role_of(receiver).await?);

        check_role(ACTION, &receiver_caller, Role::Consumer)?;
        check_owner(ACTION, &source, caller)?;
        check_owner(ACTION, &target, &receiver_caller)?;
        check_holding(ACTION, &source)?;
        check_holding(ACTION, &target)?;
        if source.issuer_shop_id != target.issuer_shop_id {
            warn!(
                "{}: '{}' and '{}' have different issuers",
                ACTION, source_id, target_id
            );
            return Err(Error::denied(ACTION, "cards belong to different shops"));
        }

        amounts.debit(&mut source)?;
        amounts.credit(&mut target)?;
        uow.put(&card_key(source_id), &source)?;
        uow.put(&card_key(target_id), &target)?;
        uow.commit().await?;
        info!(
            "Moved {}/{} from '{}' to '{}'",
            amounts.money, amounts.point, source_id, target_id
        );
        Ok(())
    }

    /// Credits a consumer's card from its issuing shop.
    pub async fn deposit(
        &mut self,
        caller: &Caller,
        amounts: Amounts,
        receiver: &str,
        target_id: &str,
    ) -> Result<()> {
        const ACTION: &str = "deposit_mp_shop_to_consumer";
        check_role(ACTION, caller, Role::Shop)?;
        let mut uow = UnitOfWork::new(self.store());
        let mut target = load_card(&uow, target_id).await?;
        let receiver_caller = Caller::new(receiver, self.role_of(receiver).await?);

        check_role(ACTION, &receiver_caller, Role::Consumer)?;
        check_owner(ACTION, &target, &receiver_caller)?;
        check_holding(ACTION, &target)?;
        if target.issuer_shop_id != caller.id {
            return Err(Error::denied(ACTION, "card was issued by another shop"));
        }
        let mut ledger = registered_ledger(&uow, ACTION, &target, &caller.id).await?;

        amounts.credit(&mut target)?;
        ledger.record_deposit(amounts.money, amounts.point)?;
        uow.put(&card_key(target_id), &target)?;
        stage_ledger(&mut uow, &ledger)?;
        uow.commit().await?;
        info!(
            "{} deposited {}/{} on '{}'",
            caller.id, amounts.money, amounts.point, target_id
        );
        Ok(())
    }

    /// Debits the caller's card in favour of `shop_id`.
    pub async fn spend(
        &mut self,
        caller: &Caller,
        amounts: Amounts,
        source_id: &str,
        shop_id: &str,
    ) -> Result<()> {
        const ACTION: &str = "spend_mp_consumer_to_shop";
        check_role(ACTION, caller, Role::Consumer)?;
        let mut uow = UnitOfWork::new(self.store());
        let mut source = load_card(&uow, source_id).await?;

        check_owner(ACTION, &source, caller)?;
        check_holding(ACTION, &source)?;
        let mut ledger = registered_ledger(&uow, ACTION, &source, shop_id).await?;
        if source.issuer_shop_id != shop_id {
            warn!("{}: '{}' paid to wrong shop {}", ACTION, source_id, shop_id);
            return Err(Error::denied(ACTION, "pay to wrong shop"));
        }

        amounts.debit(&mut source)?;
        ledger.record_consumption(amounts.money, amounts.point)?;
        uow.put(&card_key(source_id), &source)?;
        stage_ledger(&mut uow, &ledger)?;
        uow.commit().await?;
        info!(
            "'{}' spent {}/{} at {}",
            source_id, amounts.money, amounts.point, shop_id
        );
        Ok(())
    }
}

/// Ledger of `card`'s template, which must be registered to `shop_id`.
async fn registered_ledger<S: LedgerStore>(
    uow: &UnitOfWork<'_, S>,
    action: &'static str,
    card: &Card,
    shop_id: &str,
) -> Result<ShopLedger> {
    match load_ledger(uow, &card.template_id).await? {
        Some(ledger) if ledger.shop_id == shop_id => Ok(ledger),
        _ => {
            warn!(
                "{}: no ledger for {} registered to {}",
                action, card.template_id, shop_id
            );
            Err(Error::denied(action, "pay to wrong shop"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        SequentialStore, admin, caller, consumer_card, consumer_card_from, seeded_ledger,
        seeded_ledger_on,
    };

    #[test]
    fn test_amount_parsing() {
        assert_eq!(parse_amount("money", " 30 ").ok(), Some(30));
        assert!(parse_amount("money", "3.5").is_err());
        assert!(parse_amount("money", "-1").is_err());
        assert!(Amounts::parse("0", "0").is_err());
        assert_eq!(
            Amounts::parse("0", "5").ok(),
            Some(Amounts { money: 0, point: 5 })
        );
    }

    #[tokio::test]
    async fn test_spend_debits_card_and_counts_consumption() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;

        ledger
            .spend(&c1, Amounts::new(30, 10)?, &card_id, "S1")
            .await?;

        let card = ledger.get_card_details(&c1, &card_id).await?;
        assert_eq!((card.money, card.point), (70, 40));
        let shop_ledger = ledger.get_shop_ledger(&admin(), "S1", "ABC001").await?;
        assert_eq!(shop_ledger.consume_money, 30);
        assert_eq!(shop_ledger.consume_point, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_overspend_changes_nothing() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        let before = ledger.store().snapshot()?;

        let result = ledger
            .spend(&c1, Amounts::new(200, 0)?, &card_id, "S1")
            .await;

        match result {
            Err(Error::InsufficientFunds {
                money,
                needed_money,
                ..
            }) => {
                assert_eq!(money, 100);
                assert_eq!(needed_money, 200);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(ledger.store().snapshot()?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_point_shortfall_is_insufficient_even_with_money() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        let before = ledger.store().snapshot()?;

        let result = ledger
            .spend(&c1, Amounts::new(10, 60)?, &card_id, "S1")
            .await;

        match result {
            Err(Error::InsufficientFunds {
                money,
                point,
                needed_money,
                needed_point,
                ..
            }) => {
                assert_eq!((money, needed_money), (100, 10));
                assert_eq!((point, needed_point), (50, 60));
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(ledger.store().snapshot()?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_ledger_write_leaves_card_untouched() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let s1 = caller("S1", Role::Shop);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        ledger.store().fail_writes_to("shopledger/ABC001")?;
        let before = ledger.store().snapshot()?;

        assert!(matches!(
            ledger.spend(&c1, Amounts::new(30, 10)?, &card_id, "S1").await,
            Err(Error::StorageFailure { .. })
        ));
        assert!(matches!(
            ledger.deposit(&s1, Amounts::new(25, 5)?, "C1", &card_id).await,
            Err(Error::StorageFailure { .. })
        ));
        assert_eq!(ledger.store().snapshot()?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_ledger_write_rolls_back_card_on_sequential_store() -> Result<()> {
        let mut ledger = seeded_ledger_on(SequentialStore::default()).await?;
        let c1 = caller("C1", Role::Consumer);
        let s1 = caller("S1", Role::Shop);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        ledger.store().inner().fail_writes_to("shopledger/ABC001")?;
        let before = ledger.store().inner().snapshot()?;

        // The card key sorts first, so it is written and then restored
        assert!(matches!(
            ledger.spend(&c1, Amounts::new(30, 10)?, &card_id, "S1").await,
            Err(Error::StorageFailure { .. })
        ));
        assert!(matches!(
            ledger.deposit(&s1, Amounts::new(25, 5)?, "C1", &card_id).await,
            Err(Error::StorageFailure { .. })
        ));
        assert_eq!(ledger.store().inner().snapshot()?, before);

        let card = ledger.get_card_details(&c1, &card_id).await?;
        assert_eq!((card.money, card.point), (100, 50));
        let shop_ledger = ledger.get_shop_ledger(&s1, "S1", "ABC001").await?;
        assert_eq!((shop_ledger.consume_money, shop_ledger.deposit_money), (0, 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_spend_at_wrong_shop_is_denied() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        assert!(matches!(
            ledger
                .spend(&c1, Amounts::new(1, 0)?, &card_id, "S2")
                .await,
            Err(Error::PermissionDenied { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_peer_transfer_conserves_balances() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let source = consumer_card(&mut ledger, "ABC001", "C1").await?;
        let target = ledger
            .push_card(&caller("S1", Role::Shop), "C2", "ABC001")
            .await?;

        ledger
            .transfer_balance(&c1, Amounts::new(40, 15)?, &source, "C2", &target)
            .await?;

        let s = ledger.get_card_details(&admin(), &source).await?;
        let t = ledger.get_card_details(&admin(), &target).await?;
        assert_eq!(s.money + t.money, 200);
        assert_eq!(s.point + t.point, 100);
        assert_eq!((s.money, t.money), (60, 140));

        // Overdraw leaves both cards as they were
        let before = ledger.store().snapshot()?;
        assert!(matches!(
            ledger
                .transfer_balance(&c1, Amounts::new(61, 0)?, &source, "C2", &target)
                .await,
            Err(Error::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.store().snapshot()?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_peer_transfer_guards() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let source = consumer_card(&mut ledger, "ABC001", "C1").await?;
        let foreign = consumer_card_from(&mut ledger, "XYZ100", "S2", "C2").await?;
        let amounts = Amounts::new(1, 0)?;

        assert!(matches!(
            ledger
                .transfer_balance(&c1, amounts, &source, "C1", &source)
                .await,
            Err(Error::InvalidArgument { .. })
        ));
        // Issued by S2, so the issuers differ
        assert!(matches!(
            ledger
                .transfer_balance(&c1, amounts, &source, "C2", &foreign)
                .await,
            Err(Error::PermissionDenied { .. })
        ));
        // C2 does not own the source card
        assert!(matches!(
            ledger
                .transfer_balance(&caller("C2", Role::Consumer), amounts, &source, "C2", &foreign)
                .await,
            Err(Error::PermissionDenied { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_credits_card_and_ledger() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let s1 = caller("S1", Role::Shop);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;

        ledger
            .deposit(&s1, Amounts::new(25, 5)?, "C1", &card_id)
            .await?;
        let card = ledger.get_card_details(&s1, &card_id).await?;
        assert_eq!((card.money, card.point), (125, 55));
        let shop_ledger = ledger.get_shop_ledger(&s1, "S1", "ABC001").await?;
        assert_eq!(shop_ledger.deposit_money, 25);
        assert_eq!(shop_ledger.deposit_point, 5);

        let s2 = caller("S2", Role::Shop);
        assert!(matches!(
            ledger.deposit(&s2, Amounts::new(1, 0)?, "C1", &card_id).await,
            Err(Error::PermissionDenied { .. })
        ));
        assert!(matches!(
            ledger.deposit(&s1, Amounts::new(1, 0)?, "C2", &card_id).await,
            Err(Error::PermissionDenied { .. })
        ));
        Ok(())
    }
}
