//! Card operations - transfers, retirement, field updates, and card queries.

use tracing::{info, warn};

use super::accounting::{load_ledger, stage_ledger};
use super::balance::parse_amount;
use super::keys::{card_key, is_issued_form, validate_card_id};
use super::lifecycle::{CardField, Transfer, can_view, check_scrap};
use super::registry::{self, Registry};
use super::{Caller, CardLedger, clock};
use crate::entities::Card;
use crate::errors::{Error, Result};
use crate::store::{LedgerStore, UnitOfWork};

/// Loads a card record, template or instance.
pub async fn load_card<S: LedgerStore>(uow: &UnitOfWork<'_, S>, id: &str) -> Result<Card> {
    uow.load(&card_key(id))
        .await?
        .ok_or_else(|| Error::not_found("card", id))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::invalid(format!(
            "expected 'true' or 'false', got '{other}'"
        ))),
    }
}

impl<S: LedgerStore> CardLedger<S> {
    /// Moves a card to `recipient` along one of the [`Transfer`] edges.
    ///
    /// A card handed back to its issuing shop counts as a return on that
    /// template's ledger.
    pub async fn transfer(
        &mut self,
        caller: &Caller,
        transfer: Transfer,
        card_id: &str,
        recipient: &str,
    ) -> Result<()> {
        let mut uow = UnitOfWork::new(self.store());
        let mut card = load_card(&uow, card_id).await?;
        let recipient_role = self.role_of(recipient).await?;
        transfer.check(&card, caller, recipient_role)?;
        transfer.apply(&mut card, recipient, &clock::now());

        if transfer == Transfer::ConsumerToShop && recipient == card.issuer_shop_id {
            match load_ledger(&uow, &card.template_id).await? {
                Some(mut ledger) => {
                    ledger.record_return()?;
                    stage_ledger(&mut uow, &ledger)?;
                }
                None => warn!("No ledger for template '{}', return not counted", card.template_id),
            }
        }

        uow.put(&card_key(card_id), &card)?;
        uow.commit().await?;
        info!(
            "{}: '{}' moved from {} to {}",
            transfer.action(),
            card_id,
            caller.id,
            recipient
        );
        Ok(())
    }

    /// Retires a card for good.
    pub async fn scrap_card(&mut self, caller: &Caller, card_id: &str) -> Result<()> {
        let mut uow = UnitOfWork::new(self.store());
        let mut card = load_card(&uow, card_id).await?;
        check_scrap(&card, caller)?;
        card.scrapped = true;

        if !card.is_template() {
            match load_ledger(&uow, &card.template_id).await? {
                Some(mut ledger) => {
                    ledger.record_scrap()?;
                    stage_ledger(&mut uow, &ledger)?;
                }
                None => warn!("No ledger for template '{}', scrap not counted", card.template_id),
            }
        }

        uow.put(&card_key(card_id), &card)?;
        uow.commit().await?;
        info!("Card '{}' scrapped by {}", card_id, caller.id);
        Ok(())
    }

    /// Sets one field of a card from its string form.
    ///
    /// Changing the card id moves the record to its new key. Money and point
    /// are overwritten without touching the shop ledger.
    pub async fn update_card_field(
        &mut self,
        caller: &Caller,
        field: CardField,
        card_id: &str,
        value: &str,
    ) -> Result<()> {
        let mut uow = UnitOfWork::new(self.store());
        let mut card = load_card(&uow, card_id).await?;
        field.check(&card, caller)?;

        let mut key = card_key(card_id);
        match field {
            CardField::ShopName => card.issuer_shop_name = value.to_string(),
            CardField::ShopId => card.issuer_shop_id = value.to_string(),
            CardField::Category => card.category = value.to_string(),
            CardField::Level => card.level = value.to_string(),
            CardField::Class => card.class = value.to_string(),
            CardField::Phone => card.phone = value.to_string(),
            CardField::Password => card.password = value.to_string(),
            CardField::ExpiryDate => card.expiry_date = value.to_string(),
            CardField::CardId => {
                key = self.rekey(&mut uow, &card, value).await?;
                card.card_id = value.to_string();
            }
            CardField::Money => {
                let money = parse_amount("money", value)?;
                warn!(
                    "Money on '{}' set {} -> {} by {} outside the ledger",
                    card_id, card.money, money, caller.id
                );
                card.money = money;
            }
            CardField::Point => {
                let point = parse_amount("point", value)?;
                warn!(
                    "Point on '{}' set {} -> {} by {} outside the ledger",
                    card_id, card.point, point, caller.id
                );
                card.point = point;
            }
            CardField::Expired => {
                let expired = parse_flag(value)?;
                if card.expired && !expired {
                    warn!("{} tried to revoke expiry of '{}'", caller.id, card_id);
                    return Err(Error::denied(field.action(), "an expired card stays expired"));
                }
                if expired && !card.expired && !card.is_template() {
                    match load_ledger(&uow, &card.template_id).await? {
                        Some(mut ledger) => {
                            ledger.record_expiry()?;
                            stage_ledger(&mut uow, &ledger)?;
                        }
                        None => warn!(
                            "No ledger for template '{}', expiry not counted",
                            card.template_id
                        ),
                    }
                }
                card.expired = expired;
            }
        }

        uow.put(&key, &card)?;
        uow.commit().await?;
        info!("{} on '{}' by {}", field.action(), card_id, caller.id);
        Ok(())
    }

    /// Stages the move of `card` to `new_id` and returns the new key.
    async fn rekey(&self, uow: &mut UnitOfWork<'_, S>, card: &Card, new_id: &str) -> Result<String> {
        if card.is_template() {
            return Err(Error::denied(
                CardField::CardId.action(),
                "a template has no card id",
            ));
        }
        validate_card_id(new_id)?;
        let new_key = card_key(new_id);
        if new_id == card.card_id {
            return Ok(new_key);
        }
        if uow.exists(&new_key).await? {
            return Err(Error::already_exists("card", new_id));
        }
        if is_issued_form(new_id) {
            return Err(Error::invalid(format!(
                "'{new_id}' has the form of an issued id and is reserved for issuance"
            )));
        }
        uow.delete(&card_key(&card.card_id));
        registry::CARDS.rename(uow, &card.card_id, new_id).await?;
        Ok(new_key)
    }

    /// A card's full record, for its owner, the authority, or a shop.
    pub async fn get_card_details(&self, caller: &Caller, card_id: &str) -> Result<Card> {
        let uow = UnitOfWork::new(self.store());
        let card = load_card(&uow, card_id).await?;
        if !can_view(&card, caller) {
            warn!("{} may not read card '{}'", caller.id, card_id);
            return Err(Error::denied("get_card_details", "not the owner"));
        }
        Ok(card)
    }

    /// Issued cards the caller may read.
    pub async fn get_cards(&self, caller: &Caller) -> Result<Vec<Card>> {
        self.visible_cards(&registry::CARDS, caller).await
    }

    /// Templates the caller may read.
    pub async fn get_card_templates(&self, caller: &Caller) -> Result<Vec<Card>> {
        self.visible_cards(&registry::TEMPLATES, caller).await
    }

    async fn visible_cards(&self, registry: &Registry, caller: &Caller) -> Result<Vec<Card>> {
        let uow = UnitOfWork::new(self.store());
        let mut cards = Vec::new();
        for id in registry.ids(&uow).await? {
            match uow.load::<Card>(&card_key(&id)).await? {
                Some(card) if can_view(&card, caller) => cards.push(card),
                Some(_) => {}
                None => warn!("Registry '{}' lists missing card '{}'", registry.key(), id),
            }
        }
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Amounts;
    use crate::entities::{CardStatus, Role};
    use crate::test_utils::{admin, caller, consumer_card, create_template, seeded_ledger};

    #[tokio::test]
    async fn test_template_reaches_consumer() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let shop = caller("S1", Role::Shop);
        create_template(&mut ledger, "ABC001", "S1").await?;
        ledger
            .transfer(&admin(), Transfer::TemplateToShop, "ABC001", "S1")
            .await?;
        let ids = ledger.issue_batch(&shop, "ABC001", 1).await?;
        ledger
            .transfer(&shop, Transfer::ShopToConsumer, &ids[0], "C1")
            .await?;

        let card = ledger
            .get_card_details(&caller("C1", Role::Consumer), &ids[0])
            .await?;
        assert_eq!(card.owner, "C1");
        assert_eq!(card.status, CardStatus::AtConsumer);
        assert!(!card.release_date.is_empty());

        let template = ledger.get_card_details(&admin(), "ABC001").await?;
        assert_eq!(template.owner, "S1");
        assert_eq!(template.status, CardStatus::AtShop);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_recipient_fails() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        create_template(&mut ledger, "ABC001", "S1").await?;
        assert!(matches!(
            ledger
                .transfer(&admin(), Transfer::TemplateToShop, "ABC001", "nobody")
                .await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            ledger
                .transfer(&admin(), Transfer::TemplateToShop, "XYZ999", "S1")
                .await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_return_to_issuer_counts_on_ledger() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;

        ledger
            .transfer(&c1, Transfer::ConsumerToConsumer, &card_id, "C2")
            .await?;
        let c2 = caller("C2", Role::Consumer);
        ledger
            .transfer(&c2, Transfer::ConsumerToShop, &card_id, "S1")
            .await?;

        let card = ledger.get_card_details(&admin(), &card_id).await?;
        assert_eq!(card.owner, "S1");
        assert_eq!(card.status, CardStatus::AtConsumer);
        let shop_ledger = ledger.get_shop_ledger(&admin(), "S1", "ABC001").await?;
        assert_eq!(shop_ledger.returned_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_scrapped_card_is_terminal() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let s1 = caller("S1", Role::Shop);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;

        ledger.scrap_card(&c1, &card_id).await?;
        let scrapped = ledger.store().snapshot()?;

        assert!(ledger.scrap_card(&c1, &card_id).await.is_err());
        assert!(
            ledger
                .transfer(&c1, Transfer::ConsumerToConsumer, &card_id, "C2")
                .await
                .is_err()
        );
        assert!(
            ledger
                .update_card_field(&c1, CardField::Phone, &card_id, "555")
                .await
                .is_err()
        );
        assert!(
            ledger
                .update_card_field(&s1, CardField::Money, &card_id, "999")
                .await
                .is_err()
        );
        assert!(
            ledger
                .deposit(&s1, Amounts::new(5, 0)?, "C1", &card_id)
                .await
                .is_err()
        );
        assert_eq!(ledger.store().snapshot()?, scrapped);

        let shop_ledger = ledger.get_shop_ledger(&s1, "S1", "ABC001").await?;
        assert_eq!(shop_ledger.scrapped_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_flag_is_set_once_by_the_holding_shop() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let shop = caller("S1", Role::Shop);
        create_template(&mut ledger, "ABC001", "S1").await?;
        let ids = ledger.issue_batch(&shop, "ABC001", 1).await?;
        let card_id = &ids[0];

        assert!(matches!(
            ledger
                .update_card_field(&shop, CardField::Expired, card_id, "yes")
                .await,
            Err(Error::InvalidArgument { .. })
        ));
        ledger
            .update_card_field(&shop, CardField::Expired, card_id, "true")
            .await?;
        ledger
            .update_card_field(&shop, CardField::Expired, card_id, "true")
            .await?;
        assert!(matches!(
            ledger
                .update_card_field(&shop, CardField::Expired, card_id, "false")
                .await,
            Err(Error::PermissionDenied { .. })
        ));
        assert!(matches!(
            ledger
                .update_card_field(&shop, CardField::Expired, card_id, "true")
                .await,
            Ok(())
        ));

        let shop_ledger = ledger.get_shop_ledger(&admin(), "S1", "ABC001").await?;
        assert_eq!(shop_ledger.expired_count, 1);
        assert!(ledger.get_card_details(&shop, card_id).await?.expired);
        Ok(())
    }

    #[tokio::test]
    async fn test_consumer_cannot_toggle_expiry() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        let before = ledger.store().snapshot()?;

        for value in ["true", "false"] {
            assert!(matches!(
                ledger
                    .update_card_field(&c1, CardField::Expired, &card_id, value)
                    .await,
                Err(Error::PermissionDenied { .. })
            ));
        }
        assert_eq!(ledger.store().snapshot()?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_card_returned_to_shop_cannot_be_revived() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let c1 = caller("C1", Role::Consumer);
        let s1 = caller("S1", Role::Shop);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        ledger
            .transfer(&c1, Transfer::ConsumerToShop, &card_id, "S1")
            .await?;

        ledger
            .update_card_field(&s1, CardField::Expired, &card_id, "true")
            .await?;
        assert!(
            ledger
                .update_card_field(&s1, CardField::Expired, &card_id, "false")
                .await
                .is_err()
        );
        assert!(ledger.get_card_details(&s1, &card_id).await?.expired);
        let shop_ledger = ledger.get_shop_ledger(&s1, "S1", "ABC001").await?;
        assert_eq!(shop_ledger.expired_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_card_id_cannot_take_an_issuable_id() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let shop = caller("S1", Role::Shop);
        create_template(&mut ledger, "ABC001", "S1").await?;
        let ids = ledger.issue_batch(&shop, "ABC001", 1).await?;

        for reserved in ["ABC001-A1000002", "ABC001-A2000000", "XYZ100-A1000001"] {
            assert!(matches!(
                ledger
                    .update_card_field(&shop, CardField::CardId, &ids[0], reserved)
                    .await,
                Err(Error::InvalidArgument { .. })
            ));
        }

        let next = ledger.issue_batch(&shop, "ABC001", 2).await?;
        assert_eq!(next, ["ABC001-A1000002", "ABC001-A1000003"]);
        let requested = ledger
            .request_card(&caller("C1", Role::Consumer), "ABC001")
            .await?;
        assert_eq!(requested, "ABC001-A1000004");
        Ok(())
    }

    #[tokio::test]
    async fn test_card_id_change_moves_record() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let shop = caller("S1", Role::Shop);
        create_template(&mut ledger, "ABC001", "S1").await?;
        let ids = ledger.issue_batch(&shop, "ABC001", 2).await?;

        assert!(matches!(
            ledger
                .update_card_field(&shop, CardField::CardId, &ids[0], &ids[1])
                .await,
            Err(Error::AlreadyExists { .. })
        ));
        assert!(matches!(
            ledger
                .update_card_field(&shop, CardField::CardId, &ids[0], "NOHYPHEN")
                .await,
            Err(Error::InvalidArgument { .. })
        ));

        ledger
            .update_card_field(&shop, CardField::CardId, &ids[0], "ABC001-VIP1")
            .await?;
        assert!(matches!(
            ledger.get_card_details(&shop, &ids[0]).await,
            Err(Error::NotFound { .. })
        ));
        let moved = ledger.get_card_details(&shop, "ABC001-VIP1").await?;
        assert_eq!(moved.card_id, "ABC001-VIP1");

        let listed: Vec<String> = ledger
            .get_cards(&shop)
            .await?
            .into_iter()
            .map(|c| c.card_id)
            .collect();
        assert_eq!(listed, vec!["ABC001-VIP1".to_string(), ids[1].clone()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_direct_balance_set_bypasses_ledger() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let s1 = caller("S1", Role::Shop);
        let card_id = consumer_card(&mut ledger, "ABC001", "C1").await?;
        let before = ledger.get_shop_ledger(&s1, "S1", "ABC001").await?;

        ledger
            .update_card_field(&s1, CardField::Money, &card_id, "7")
            .await?;
        assert!(matches!(
            ledger
                .update_card_field(&s1, CardField::Point, &card_id, "-1")
                .await,
            Err(Error::InvalidArgument { .. })
        ));

        assert_eq!(ledger.get_card_details(&s1, &card_id).await?.money, 7);
        assert_eq!(ledger.get_shop_ledger(&s1, "S1", "ABC001").await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_card_listing_respects_visibility() -> Result<()> {
        let mut ledger = seeded_ledger().await?;
        let first = consumer_card(&mut ledger, "ABC001", "C1").await?;
        let second = consumer_card(&mut ledger, "XYZ100", "C2").await?;

        let mine = ledger.get_cards(&caller("C1", Role::Consumer)).await?;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].card_id, first);

        let all = ledger.get_cards(&admin()).await?;
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|c| c.card_id == second));

        assert!(matches!(
            ledger
                .get_card_details(&caller("C2", Role::Consumer), &first)
                .await,
            Err(Error::PermissionDenied { .. })
        ));
        assert_eq!(ledger.get_card_templates(&admin()).await?.len(), 2);
        assert!(
            ledger
                .get_card_templates(&caller("C1", Role::Consumer))
                .await?
                .is_empty()
        );
        Ok(())
    }
}
