//! Card state machine guards.
//!
//! Everything here is pure: a guard looks at a card, the caller, and where
//! relevant the recipient's role, and either approves or names the failed
//! guard. The operations in `cards` load records, run these, and commit.
//! A scrapped card fails every guard.

use tracing::warn;

use super::Caller;
use crate::entities::{Card, CardStatus, Role};
use crate::errors::{Error, Result};

/// Ownership transfers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Authority hands a template to a shop
    TemplateToShop,
    /// Shop releases a card to a consumer
    ShopToConsumer,
    /// Consumer gives a card to another consumer
    ConsumerToConsumer,
    /// Consumer hands a card to a shop
    ConsumerToShop,
}

impl Transfer {
    /// Command name of the transfer.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::TemplateToShop => "transfer_template_to_shop",
            Self::ShopToConsumer => "transfer_card_shop_to_consumer",
            Self::ConsumerToConsumer => "transfer_card_consumer_to_consumer",
            Self::ConsumerToShop => "transfer_card_consumer_to_shop",
        }
    }

    /// (caller role, recipient role, required status)
    const fn rule(self) -> (Role, Role, CardStatus) {
        match self {
            Self::TemplateToShop => (Role::Authority, Role::Shop, CardStatus::Template),
            Self::ShopToConsumer => (Role::Shop, Role::Consumer, CardStatus::AtShop),
            Self::ConsumerToConsumer => (Role::Consumer, Role::Consumer, CardStatus::AtConsumer),
            Self::ConsumerToShop => (Role::Consumer, Role::Shop, CardStatus::AtConsumer),
        }
    }

    /// Approves moving `card` from `caller` to a recipient holding `recipient_role`.
    pub fn check(self, card: &Card, caller: &Caller, recipient_role: Role) -> Result<()> {
        let action = self.action();
        let (caller_role, wanted_recipient, status) = self.rule();
        check_live(action, card)?;
        check_owner(action, card, caller)?;
        check_role(action, caller, caller_role)?;
        check_status(action, card, status)?;
        if recipient_role != wanted_recipient {
            return Err(deny(
                action,
                card,
                format!("recipient must be {wanted_recipient}, not {recipient_role}"),
            ));
        }
        match self {
            Self::TemplateToShop if !card.is_template() || card.template_id.is_empty() => {
                Err(deny(action, card, "not a template".to_string()))
            }
            Self::ShopToConsumer if !card.has_release_fields() => Err(deny(
                action,
                card,
                "shop name, card id, level, class, and expiry date must be set".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Moves `card` to `recipient`, stamping dates with `now`.
    pub fn apply(self, card: &mut Card, recipient: &str, now: &str) {
        card.owner = recipient.to_string();
        card.acquired_date = now.to_string();
        match self {
            Self::TemplateToShop => {
                card.status = CardStatus::AtShop;
                card.release_date = now.to_string();
            }
            Self::ShopToConsumer => {
                card.status = CardStatus::AtConsumer;
                card.release_date = now.to_string();
            }
            // Holder becomes a shop but the card keeps its consumer status
            Self::ConsumerToConsumer | Self::ConsumerToShop => {}
        }
    }
}

/// Card fields with their own update command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardField {
    /// Issuing shop display name
    ShopName,
    /// Issuing shop identity
    ShopId,
    /// Instance id; changing it re-keys the record
    CardId,
    /// Category
    Category,
    /// Level
    Level,
    /// Class
    Class,
    /// Phone
    Phone,
    /// Password
    Password,
    /// Money balance, set directly
    Money,
    /// Point balance, set directly
    Point,
    /// Expiry date
    ExpiryDate,
    /// Expired flag
    Expired,
}

impl CardField {
    /// Every field, in command-table order.
    pub const ALL: [Self; 12] = [
        Self::ShopName,
        Self::ShopId,
        Self::CardId,
        Self::Category,
        Self::Level,
        Self::Class,
        Self::Phone,
        Self::Password,
        Self::Money,
        Self::Point,
        Self::ExpiryDate,
        Self::Expired,
    ];

    /// Command name of the setter.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::ShopName => "update_ct_shopname",
            Self::ShopId => "update_ct_shopid",
            Self::CardId => "update_ct_cardid",
            Self::Category => "update_ct_category",
            Self::Level => "update_ct_cardlevel",
            Self::Class => "update_ct_cardclass",
            Self::Phone => "update_ct_tel",
            Self::Password => "update_ct_password",
            Self::Money => "update_ct_money",
            Self::Point => "update_ct_point",
            Self::ExpiryDate => "update_ct_expdate",
            Self::Expired => "update_ct_expired",
        }
    }

    /// Setter for a command name.
    #[must_use]
    pub fn from_action(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.action() == action)
    }

    /// Approves `caller` changing this field on `card`.
    pub fn check(self, card: &Card, caller: &Caller) -> Result<()> {
        let action = self.action();
        check_live(action, card)?;
        match self {
            Self::ShopName
            | Self::ShopId
            | Self::CardId
            | Self::Level
            | Self::Class
            | Self::ExpiryDate => {
                check_owner(action, card, caller)?;
                check_role(action, caller, Role::Shop)?;
                check_status(action, card, CardStatus::AtShop)
            }
            Self::Category | Self::Phone => {
                check_owner(action, card, caller)?;
                check_role(action, caller, Role::Consumer)?;
                check_status(action, card, CardStatus::AtConsumer)
            }
            Self::Expired => {
                check_owner(action, card, caller)?;
                check_role(action, caller, Role::Shop)
            }
            Self::Password => check_owner(action, card, caller),
            Self::Money | Self::Point => {
                check_role(action, caller, Role::Shop)?;
                if card.issuer_shop_id == caller.id {
                    Ok(())
                } else {
                    Err(deny(action, card, format!("{} is not the issuing shop", caller.id)))
                }
            }
        }
    }
}

/// Approves scrapping `card`. Only the owner may, and only once.
pub fn check_scrap(card: &Card, caller: &Caller) -> Result<()> {
    check_live("scrap_card", card)?;
    check_owner("scrap_card", card, caller)
}

/// Who may read a card's details: its owner, the authority, and shops.
#[must_use]
pub fn can_view(card: &Card, caller: &Caller) -> bool {
    card.owner == caller.id || matches!(caller.role, Role::Authority | Role::Shop)
}

/// Fails when `card` is scrapped.
pub fn check_live(action: &'static str, card: &Card) -> Result<()> {
    if card.scrapped {
        return Err(deny(action, card, "card is scrapped".to_string()));
    }
    Ok(())
}

/// Fails when `caller` does not hold `card`.
pub fn check_owner(action: &'static str, card: &Card, caller: &Caller) -> Result<()> {
    if card.owner != caller.id {
        return Err(deny(action, card, format!("{} is not the owner", caller.id)));
    }
    Ok(())
}

/// Fails unless `caller` has `role`.
pub fn check_role(action: &'static str, caller: &Caller, role: Role) -> Result<()> {
    if caller.role != role {
        warn!("{} by {}: role {} required, has {}", action, caller.id, role, caller.role);
        return Err(Error::denied(action, format!("requires role {role}")));
    }
    Ok(())
}

/// Fails unless `card` is in `status`.
pub fn check_status(action: &'static str, card: &Card, status: CardStatus) -> Result<()> {
    if card.status != status {
        return Err(deny(
            action,
            card,
            format!("card is {}, expected {status}", card.status),
        ));
    }
    Ok(())
}

/// Fails unless `card` is neither scrapped nor expired.
pub fn check_active(action: &'static str, card: &Card) -> Result<()> {
    check_live(action, card)?;
    if card.expired {
        return Err(deny(action, card, "card is expired".to_string()));
    }
    Ok(())
}

fn deny(action: &'static str, card: &Card, reason: String) -> Error {
    warn!("{} on '{}' denied: {}", action, card.storage_id(), reason);
    Error::denied(action, reason)
}
