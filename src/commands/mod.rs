//! Command layer - typed commands parsed from a function name and positional
//! string arguments, then dispatched against a [`CardLedger`](crate::core::CardLedger).
//!
//! Argument 0 of every invocation is the caller identity. Parsing checks arity
//! and converts numbers and JSON once, so the core only ever sees typed values.

/// Dispatch of parsed commands against the ledger
pub mod dispatch;
/// Parsing of function names and positional arguments
pub mod parse;

pub use dispatch::dispatch;

use crate::core::{Amounts, CardField, Transfer};
use crate::entities::{Shop, TemplateFields, User};

/// One parsed invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Identity making the call
    pub caller: String,
    /// What to do
    pub command: Command,
}

/// Arguments of `transfer_mp_consumer_to_consumer`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceTransfer {
    /// Amounts to move
    pub amounts: Amounts,
    /// Card debited, owned by the caller
    pub source_card: String,
    /// Owner of the target card
    pub receiver: String,
    /// Card credited
    pub target_card: String,
}

/// Arguments of `deposit_mp_shop_to_consumer`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deposit {
    /// Amounts to credit
    pub amounts: Amounts,
    /// Owner of the target card
    pub receiver: String,
    /// Card credited
    pub target_card: String,
}

/// Arguments of `spend_mp_consumer_to_shop`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spend {
    /// Amounts to debit
    pub amounts: Amounts,
    /// Card debited, owned by the caller
    pub source_card: String,
    /// Shop paid
    pub shop_id: String,
}

/// Every operation the ledger accepts
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `add_user`
    AddUser(User),
    /// `update_user`
    UpdateUser(User),
    /// `delete_user`
    DeleteUser {
        /// User to remove
        identity: String,
    },
    /// `add_shop`
    AddShop(Shop),
    /// `update_shop`
    UpdateShop(Shop),
    /// `delete_shop`
    DeleteShop {
        /// Shop to remove
        shop_id: String,
    },
    /// `create_card_template`, `create_card_template_by_shop`
    CreateTemplate {
        /// New template id
        template_id: String,
        /// Caller-supplied fields
        fields: TemplateFields,
    },
    /// `request_card_by_template`
    RequestCard {
        /// Template to issue from
        template_id: String,
    },
    /// `push_card_by_template`
    PushCard {
        /// Consumer receiving the card
        owner_id: String,
        /// Template to issue from
        template_id: String,
    },
    /// `create_batch_card_by_template`
    IssueBatch {
        /// Template to issue from
        template_id: String,
        /// Number of cards
        count: u32,
    },
    /// `transfer_template_to_shop` and `transfer_card_*`
    Transfer {
        /// Which edge of the state machine
        kind: Transfer,
        /// Card or template moved
        card_id: String,
        /// New holder
        recipient: String,
    },
    /// `scrap_card`
    ScrapCard {
        /// Card retired
        card_id: String,
    },
    /// `update_ct_*`
    UpdateField {
        /// Field set
        field: CardField,
        /// Card changed
        card_id: String,
        /// New value in string form
        value: String,
    },
    /// `transfer_mp_consumer_to_consumer`
    TransferBalance(BalanceTransfer),
    /// `deposit_mp_shop_to_consumer`
    Deposit(Deposit),
    /// `spend_mp_consumer_to_shop`
    Spend(Spend),
    /// `get_users`
    GetUsers,
    /// `get_user_detail`
    GetUserDetail {
        /// User read
        identity: String,
    },
    /// `get_shops`
    GetShops,
    /// `get_shop_detail`
    GetShopDetail {
        /// Shop read
        shop_id: String,
    },
    /// `get_cards`
    GetCards,
    /// `get_card_templates`
    GetCardTemplates,
    /// `get_card_details`
    GetCardDetails {
        /// Card read
        card_id: String,
    },
    /// `get_shopLedger`
    GetShopLedger {
        /// Shop the ledger is registered to
        shop_id: String,
        /// Template accounted for
        template_id: String,
    },
}

impl Command {
    /// Function name the command was invoked as.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddUser(_) => "add_user",
            Self::UpdateUser(_) => "update_user",
            Self::DeleteUser { .. } => "delete_user",
            Self::AddShop(_) => "add_shop",
            Self::UpdateShop(_) => "update_shop",
            Self::DeleteShop { .. } => "delete_shop",
            Self::CreateTemplate { .. } => "create_card_template",
            Self::RequestCard { .. } => "request_card_by_template",
            Self::PushCard { .. } => "push_card_by_template",
            Self::IssueBatch { .. } => "create_batch_card_by_template",
            Self::Transfer { kind, .. } => kind.action(),
            Self::ScrapCard { .. } => "scrap_card",
            Self::UpdateField { field, .. } => field.action(),
            Self::TransferBalance(_) => "transfer_mp_consumer_to_consumer",
            Self::Deposit(_) => "deposit_mp_shop_to_consumer",
            Self::Spend(_) => "spend_mp_consumer_to_shop",
            Self::GetUsers => "get_users",
            Self::GetUserDetail { .. } => "get_user_detail",
            Self::GetShops => "get_shops",
            Self::GetShopDetail { .. } => "get_shop_detail",
            Self::GetCards => "get_cards",
            Self::GetCardTemplates => "get_card_templates",
            Self::GetCardDetails { .. } => "get_card_details",
            Self::GetShopLedger { .. } => "get_shopLedger",
        }
    }

    /// Queries read and return JSON; everything else mutates.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.name().starts_with("get_")
    }
}
