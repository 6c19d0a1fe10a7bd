//! Store key layout and identifier rules.
//!
//! Records live under namespaced keys so a user id can never collide with a
//! card id in the flat store. Templates and instances share the `card/`
//! namespace and are told apart by the `-` every instance id carries.

use crate::errors::{Error, Result};

/// Registry of user identities
pub const USER_REGISTRY: &str = "user_holder";
/// Registry of shop ids
pub const SHOP_REGISTRY: &str = "shop_holder";
/// Registry of template ids
pub const TEMPLATE_REGISTRY: &str = "card_template_holder";
/// Registry of issued card ids
pub const CARD_REGISTRY: &str = "card_holder";

/// First card number; the n-th issued card of a template gets `BASE + n`.
const CARD_NUMBER_BASE: u128 = 1_000_000;

/// Key of a card record, template or instance.
#[must_use]
pub fn card_key(id: &str) -> String {
    format!("card/{id}")
}

/// Key of a user record.
#[must_use]
pub fn user_key(identity: &str) -> String {
    format!("user/{identity}")
}

/// Key of a shop record.
#[must_use]
pub fn shop_key(shop_id: &str) -> String {
    format!("shop/{shop_id}")
}

/// Key of the shop ledger accounting for a template.
#[must_use]
pub fn ledger_key(template_id: &str) -> String {
    format!("shopledger/{template_id}")
}

/// Instance id for the `index`-th card issued from `template_id`.
#[must_use]
pub fn generate_card_id(template_id: &str, index: u64) -> String {
    format!("{template_id}-A{}", CARD_NUMBER_BASE + u128::from(index))
}

/// True for ids of the `{template}-A{number}` form issuance generates.
#[must_use]
pub fn is_issued_form(card_id: &str) -> bool {
    card_id.rsplit_once("-A").is_some_and(|(head, number)| {
        !head.is_empty() && !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit())
    })
}

/// Template ids start with three ASCII letters and never contain `-`.
pub fn validate_template_id(template_id: &str) -> Result<()> {
    let prefix_ok = template_id.len() >= 3
        && template_id
            .bytes()
            .take(3)
            .all(|b| b.is_ascii_alphabetic());
    if !prefix_ok {
        return Err(Error::invalid(format!(
            "template id '{template_id}' must start with three letters"
        )));
    }
    if template_id.contains('-') || template_id.contains('/') {
        return Err(Error::invalid(format!(
            "template id '{template_id}' must not contain '-' or '/'"
        )));
    }
    Ok(())
}

/// Instance ids carry a `-` separating the template part from the number.
pub fn validate_card_id(card_id: &str) -> Result<()> {
    let well_formed = card_id
        .split_once('-')
        .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty());
    if !well_formed || card_id.contains('/') {
        return Err(Error::invalid(format!("'{card_id}' is not a card id")));
    }
    Ok(())
}

/// Directory identities must be non-empty and free of key separators.
pub fn validate_identity(kind: &str, identity: &str) -> Result<()> {
    if identity.trim().is_empty() || identity.contains('/') {
        return Err(Error::invalid(format!("'{identity}' is not a valid {kind} id")));
    }
    Ok(())
}
