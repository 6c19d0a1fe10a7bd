//! Card entity - The transferable, balance-bearing asset.
//!
//! A card record with an empty `card_id` is a template; once an id is assigned
//! the record is an issued instance stored under that id. Serialized field names
//! are stable and match the records already on the ledger.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a card. Serialized as its integer code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CardStatus {
    /// Prototype record owned by its creator
    #[default]
    Template,
    /// Held by a shop
    AtShop,
    /// Held by a consumer
    AtConsumer,
    /// Held by a mailbox party
    AtMailbox,
}

impl From<CardStatus> for u8 {
    fn from(status: CardStatus) -> Self {
        match status {
            CardStatus::Template => 0,
            CardStatus::AtShop => 1,
            CardStatus::AtConsumer => 2,
            CardStatus::AtMailbox => 3,
        }
    }
}

impl TryFrom<u8> for CardStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Template),
            1 => Ok(Self::AtShop),
            2 => Ok(Self::AtConsumer),
            3 => Ok(Self::AtMailbox),
            other => Err(format!("unknown card status {other}")),
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Template => "TEMPLATE",
            Self::AtShop => "AT_SHOP",
            Self::AtConsumer => "AT_CONSUMER",
            Self::AtMailbox => "AT_MAILBOX",
        };
        f.write_str(name)
    }
}

/// Card record as stored on the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    /// Key of the template this card was issued from
    #[serde(rename = "kakaid")]
    pub template_id: String,
    /// Display name of the issuing shop
    #[serde(rename = "shop")]
    pub issuer_shop_name: String,
    /// Identity of the issuing shop
    #[serde(rename = "shopid")]
    pub issuer_shop_id: String,
    /// Instance id, empty for a template
    #[serde(rename = "cardid")]
    pub card_id: String,
    /// Consumer-maintained category
    pub category: String,
    /// Card level
    #[serde(rename = "cardlevel")]
    pub level: String,
    /// Card class
    #[serde(rename = "cardclass")]
    pub class: String,
    /// Current holder identity
    pub owner: String,
    /// Contact phone of the holder
    #[serde(rename = "tel")]
    pub phone: String,
    /// Opaque password string
    pub password: String,
    /// Stored money balance
    pub money: i64,
    /// Stored point balance
    pub point: i64,
    /// Expiry date as entered by the shop
    #[serde(rename = "expdate")]
    pub expiry_date: String,
    /// When the current holder acquired the card
    #[serde(rename = "getdate")]
    pub acquired_date: String,
    /// When the card was released to its holder
    #[serde(rename = "releasedate")]
    pub release_date: String,
    /// Expired overlay flag
    pub expired: bool,
    /// Terminal retirement flag
    pub scrapped: bool,
    /// Lifecycle state
    pub status: CardStatus,
}

impl Card {
    /// True for a template record (no instance id assigned).
    #[must_use]
    pub fn is_template(&self) -> bool {
        self.card_id.is_empty()
    }

    /// Identifier the record is stored under.
    #[must_use]
    pub fn storage_id(&self) -> &str {
        if self.is_template() {
            &self.template_id
        } else {
            &self.card_id
        }
    }

    /// Neither scrapped nor expired.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.scrapped && !self.expired
    }

    /// A template must carry these before cards can be issued from it.
    #[must_use]
    pub fn has_issuance_fields(&self) -> bool {
        !self.issuer_shop_id.is_empty()
            && !self.issuer_shop_name.is_empty()
            && !self.class.is_empty()
            && !self.expiry_date.is_empty()
    }

    /// An instance must carry these before a shop can hand it to a consumer.
    #[must_use]
    pub fn has_release_fields(&self) -> bool {
        !self.issuer_shop_name.is_empty()
            && !self.card_id.is_empty()
            && !self.level.is_empty()
            && !self.class.is_empty()
            && !self.expiry_date.is_empty()
    }

    /// Copies a template into a fresh instance with the given id.
    ///
    /// Balances, classification, and issuer fields carry over unchanged.
    #[must_use]
    pub fn instantiate(template: &Self, card_id: String) -> Self {
        Self {
            card_id,
            ..template.clone()
        }
    }
}

/// Caller-supplied fields of a new template.
///
/// Identity, ownership, lifecycle state, and dates are never taken from the
/// caller; unknown fields are rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateFields {
    /// Issuing shop display name
    #[serde(rename = "shop")]
    pub issuer_shop_name: String,
    /// Issuing shop identity
    #[serde(rename = "shopid")]
    pub issuer_shop_id: String,
    /// Category
    pub category: String,
    /// Level
    #[serde(rename = "cardlevel")]
    pub level: String,
    /// Class
    #[serde(rename = "cardclass")]
    pub class: String,
    /// Phone
    #[serde(rename = "tel")]
    pub phone: String,
    /// Password
    pub password: String,
    /// Initial money granted to each issued card
    pub money: i64,
    /// Initial points granted to each issued card
    pub point: i64,
    /// Expiry date
    #[serde(rename = "expdate")]
    pub expiry_date: String,
}

impl TemplateFields {
    /// Parses the JSON object passed on the command line. Empty input means no fields.
    pub fn from_json(raw: &str) -> crate::errors::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
            .map_err(|e| crate::errors::Error::invalid(format!("template fields: {e}")))
    }
}
