//! Shop ledger entity - Aggregate issuance and money flow for one template.
//!
//! One ledger exists per template and records which shop it is registered to.
//! Every counter only ever grows; totals are accumulated event by event and are
//! never recomputed from card records.

use serde::{Deserialize, Serialize};

/// Shop ledger record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopLedger {
    /// Template the ledger accounts for
    #[serde(rename = "templateid")]
    pub template_id: String,
    /// Shop the ledger is registered to
    #[serde(rename = "shopid")]
    pub shop_id: String,
    /// Highest card index handed out so far
    #[serde(rename = "cardIdIndex")]
    pub card_index: u64,
    /// Cards issued
    #[serde(rename = "qty")]
    pub quantity: u64,
    /// Cards marked expired
    #[serde(rename = "expiredNum")]
    pub expired_count: u64,
    /// Cards scrapped
    #[serde(rename = "scrapNum")]
    pub scrapped_count: u64,
    /// Cards returned to the issuing shop
    #[serde(rename = "backNum")]
    pub returned_count: u64,
    /// Money granted at issuance
    #[serde(rename = "initmoney")]
    pub init_money: i64,
    /// Points granted at issuance
    #[serde(rename = "initpoint")]
    pub init_point: i64,
    /// Money deposited by the shop
    #[serde(rename = "depositMoney")]
    pub deposit_money: i64,
    /// Points deposited by the shop
    #[serde(rename = "depositPoint", alias = "tdepositPoint")]
    pub deposit_point: i64,
    /// Money spent at the shop
    #[serde(rename = "consumeMoney")]
    pub consume_money: i64,
    /// Points spent at the shop
    #[serde(rename = "consumePoint")]
    pub consume_point: i64,
}
