//! Shop entity - Directory record of an issuing shop.

use serde::{Deserialize, Serialize};

/// Shop directory record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shop {
    /// Shop identity, also the store key suffix
    #[serde(rename = "shopid")]
    pub shop_id: String,
    /// Display name
    #[serde(rename = "shopname")]
    pub shop_name: String,
    /// Business license number
    #[serde(rename = "licensenum")]
    pub license_num: String,
    /// Street address
    pub address: String,
    /// Business category
    pub category: String,
    /// Contact details
    pub contact: String,
}
