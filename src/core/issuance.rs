//! Issuance engine - templates and the cards issued from them.
//!
//! Every issued id comes from the template's single ledger counter, whichever
//! path issues it, so ids for a template strictly increase and are never reused.

use tracing::{info, warn};

use super::accounting::{ensure_ledger, stage_ledger};
use super::cards::load_card;
use super::keys::{card_key, generate_card_id, validate_template_id};
use super::lifecycle::check_role;
use super::registry;
use super::{Caller, CardLedger, clock};
use crate::entities::{Card, CardStatus, Role, ShopLedger, TemplateFields};
use crate::errors::{Error, Result};
use crate::store::{LedgerStore, UnitOfWork};

/// Loads a template and checks it can be issued from.
async fn issuable_template<S: LedgerStore>(
    uow: &UnitOfWork<'_, S>,
    action: &'static str,
    template_id: &str,
) -> Result<Card> {
    validate_template_id(template_id)?;
    let template = load_card(uow, template_id).await?;
    if !template.is_template() {
        return Err(Error::invalid(format!("'{template_id}' is not a template")));
    }
    if template.scrapped {
        return Err(Error::denied(action, "template is scrapped"));
    }
    if !template.has_issuance_fields() {
        warn!("{}: template '{}' is incomplete", action, template_id);
        return Err(Error::denied(
            action,
            "template needs shop id, shop name, class, and expiry date",
        ));
    }
    Ok(template)
}

impl<S: LedgerStore> CardLedger<S> {
    /// Creates a template owned by the caller.
    ///
    /// A shop creating a template becomes its issuer; it may not name another
    /// shop as issuer.
    pub async fn create_template(
        &mut self,
        caller: &Caller,
        template_id: &str,
        fields: TemplateFields,
    ) -> Result<()> {
        const ACTION: &str = "create_card_template";
        if !matches!(caller.role, Role::Authority | Role::Shop) {
            warn!("{} by {} with role {}", ACTION, caller.id, caller.role);
            return Err(Error::denied(ACTION, "requires role authority or shop"));
        }
        validate_template_id(template_id)?;
        if fields.money < 0 || fields.point < 0 {
            return Err(Error::invalid("template balances must not be negative"));
        }

        let mut issuer_shop_id = fields.issuer_shop_id;
        if caller.role == Role::Shop {
            if issuer_shop_id.is_empty() {
                issuer_shop_id.clone_from(&caller.id);
            } else if issuer_shop_id != caller.id {
                return Err(Error::denied(ACTION, "a shop may only issue its own templates"));
            }
        }

        let key = card_key(template_id);
        let mut uow = UnitOfWork::new(self.store());
        if uow.exists(&key).await? {
            return Err(Error::already_exists("template", template_id));
        }
        let template = Card {
            template_id: template_id.to_string(),
            issuer_shop_name: fields.issuer_shop_name,
            issuer_shop_id,
            card_id: String::new(),
            category: fields.category,
            level: fields.level,
            class: fields.class,
            owner: caller.id.clone(),
            phone: fields.phone,
            password: fields.password,
            money: fields.money,
            point: fields.point,
            expiry_date: fields.expiry_date,
            status: CardStatus::Template,
            ..Card::default()
        };
        uow.put(&key, &template)?;
        registry::TEMPLATES
            .append(&mut uow, [template_id.to_string()])
            .await?;
        uow.commit().await?;
        info!("Template '{}' created by {}", template_id, caller.id);
        Ok(())
    }

    /// Issues `count` cards from a template into the issuing shop's hands.
    ///
    /// Returns the new card ids in issue order.
    pub async fn issue_batch(
        &mut self,
        caller: &Caller,
        template_id: &str,
        count: u32,
    ) -> Result<Vec<String>> {
        const ACTION: &str = "create_batch_card_by_template";
        check_role(ACTION, caller, Role::Shop)?;
        let max = self.settings().max_batch_size;
        if count == 0 || count > max {
            return Err(Error::invalid(format!(
                "batch size must be between 1 and {max}, got {count}"
            )));
        }

        let mut uow = UnitOfWork::new(self.store());
        let template = issuable_template(&uow, ACTION, template_id).await?;
        if template.issuer_shop_id != caller.id {
            return Err(Error::denied(ACTION, "only the issuing shop may issue cards"));
        }
        let mut ledger = ensure_ledger(&uow, &caller.id, template_id).await?;

        let now = clock::now();
        let first = ledger.next_card_index()?;
        let last = first
            .checked_add(u64::from(count) - 1)
            .ok_or_else(|| Error::invalid("card index overflow"))?;
        let mut ids = Vec::new();
        for index in first..=last {
            let card_id = generate_card_id(template_id, index);
            let key = card_key(&card_id);
            if uow.exists(&key).await? {
                return Err(Error::already_exists("card", card_id));
            }
            let mut card = Card::instantiate(&template, card_id.clone());
            card.owner.clone_from(&caller.id);
            card.status = CardStatus::AtShop;
            card.acquired_date.clone_from(&now);
            uow.put(&key, &card)?;
            ids.push(card_id);
        }

        ledger.record_issuance(u64::from(count), template.money, template.point)?;
        registry::CARDS.append(&mut uow, ids.iter().cloned()).await?;
        stage_ledger(&mut uow, &ledger)?;
        uow.commit().await?;
        info!(
            "Issued {} card(s) of '{}' for {} ({}..={})",
            count, template_id, caller.id, first, last
        );
        Ok(ids)
    }

    /// Issues one card to the calling consumer.
    pub async fn request_card(&mut self, caller: &Caller, template_id: &str) -> Result<String> {
        const ACTION: &str = "request_card_by_template";
        check_role(ACTION, caller, Role::Consumer)?;
        let mut uow = UnitOfWork::new(self.store());
        let template = issuable_template(&uow, ACTION, template_id).await?;
        let ledger = ensure_ledger(&uow, &template.issuer_shop_id, template_id).await?;
        let card_id = issue_single(&mut uow, &template, ledger, &caller.id).await?;
        uow.commit().await?;
        info!("Card '{}' issued on request of {}", card_id, caller.id);
        Ok(card_id)
    }

    /// Issues one card from the calling shop's template to `owner_id`.
    pub async fn push_card(
        &mut self,
        caller: &Caller,
        owner_id: &str,
        template_id: &str,
    ) -> Result<String> {
        const ACTION: &str = "push_card_by_template";
        check_role(ACTION, caller, Role::Shop)?;
        let owner = Caller::new(owner_id, self.role_of(owner_id).await?);
        check_role(ACTION, &owner, Role::Consumer)?;

        let mut uow = UnitOfWork::new(self.store());
        let template = issuable_template(&uow, ACTION, template_id).await?;
        if template.issuer_shop_id != caller.id {
            return Err(Error::denied(ACTION, "only the issuing shop may push cards"));
        }
        let ledger = ensure_ledger(&uow, &caller.id, template_id).await?;
        let card_id = issue_single(&mut uow, &template, ledger, owner_id).await?;
        uow.commit().await?;
        info!("Card '{}' pushed by {} to {}", card_id, caller.id, owner_id);
        Ok(card_id)
    }
}

/// Stages one consumer-held card and the advanced ledger.
async fn issue_single<S: LedgerStore>(
    uow: &mut UnitOfWork<'_, S>,
    template: &Card,
    mut ledger: ShopLedger,
    owner_id: &str,
) -> Result<String> {
    let card_id = generate_card_id(&template.template_id, ledger.next_card_index()?);
    let key = card_key(&card_id);
    if uow.exists(&key).await? {
        return Err(Error::already_exists("card", card_id));
    }

    let now = clock::now();
    let mut card = Card::instantiate(template, card_id.clone());
    card.owner = owner_id.to_string();
    card.status = CardStatus::AtConsumer;
    card.release_date.clone_from(&now);
    card.acquired_date = now;

    ledger.record_issuance(1, template.money, template.point)?;
    uow.put(&key, &card)?;
    registry::CARDS.append(uow, [card_id.clone()]).await?;
    stage_ledger(uow, &ledger)?;
    Ok(card_id)
}
