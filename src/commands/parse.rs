//! Parsing of `(function, args)` pairs into [`Invocation`]s.

use super::{BalanceTransfer, Command, Deposit, Invocation, Spend};
use crate::core::{Amounts, CardField, Transfer};
use crate::entities::{Shop, TemplateFields, User};
use crate::errors::{Error, Result};

/// Exactly `N` arguments after the caller.
fn take<'a, const N: usize>(function: &str, args: &'a [String]) -> Result<[&'a str; N]> {
    if args.len() != N {
        return Err(Error::invalid(format!(
            "{function} takes {N} argument(s) after the caller, got {}",
            args.len()
        )));
    }
    let mut taken = [""; N];
    for (slot, arg) in taken.iter_mut().zip(args) {
        *slot = arg.as_str();
    }
    Ok(taken)
}

fn transfer_kind(function: &str) -> Option<Transfer> {
    match function {
        "transfer_template_to_shop" => Some(Transfer::TemplateToShop),
        "transfer_card_shop_to_consumer" => Some(Transfer::ShopToConsumer),
        "transfer_card_consumer_to_consumer" => Some(Transfer::ConsumerToConsumer),
        "transfer_card_consumer_to_shop" => Some(Transfer::ConsumerToShop),
        _ => None,
    }
}

fn user(function: &str, args: &[String]) -> Result<User> {
    let [identity, name, ecert, affiliation, auth_id] = take(function, args)?;
    let affiliation = affiliation
        .trim()
        .parse()
        .map_err(|_| Error::invalid(format!("affiliation '{affiliation}' is not a number")))?;
    Ok(User {
        identity: identity.to_string(),
        name: name.to_string(),
        ecert: ecert.to_string(),
        affiliation,
        auth_id: auth_id.to_string(),
    })
}

fn shop(function: &str, args: &[String]) -> Result<Shop> {
    let [shop_id, shop_name, license_num, category, address, contact] = take(function, args)?;
    Ok(Shop {
        shop_id: shop_id.to_string(),
        shop_name: shop_name.to_string(),
        license_num: license_num.to_string(),
        address: address.to_string(),
        category: category.to_string(),
        contact: contact.to_string(),
    })
}

fn parse_count(raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::invalid(format!("count '{raw}' is not a positive integer")))
}

impl Command {
    /// Parses the arguments that follow the caller.
    pub fn parse(function: &str, args: &[String]) -> Result<Self> {
        if let Some(kind) = transfer_kind(function) {
            let [card_id, recipient] = take(function, args)?;
            return Ok(Self::Transfer {
                kind,
                card_id: card_id.to_string(),
                recipient: recipient.to_string(),
            });
        }
        if let Some(field) = CardField::from_action(function) {
            let [card_id, value] = take(function, args)?;
            return Ok(Self::UpdateField {
                field,
                card_id: card_id.to_string(),
                value: value.to_string(),
            });
        }

        let command = match function {
            "add_user" => Self::AddUser(user(function, args)?),
            "update_user" => Self::UpdateUser(user(function, args)?),
            "delete_user" => {
                let [identity] = take(function, args)?;
                Self::DeleteUser {
                    identity: identity.to_string(),
                }
            }
            "add_shop" => Self::AddShop(shop(function, args)?),
            "update_shop" => Self::UpdateShop(shop(function, args)?),
            "delete_shop" => {
                let [shop_id] = take(function, args)?;
                Self::DeleteShop {
                    shop_id: shop_id.to_string(),
                }
            }
            "create_card_template" | "create_card_template_by_shop" => match args {
                [template_id] => Self::CreateTemplate {
                    template_id: template_id.clone(),
                    fields: TemplateFields::default(),
                },
                [template_id, fields] => Self::CreateTemplate {
                    template_id: template_id.clone(),
                    fields: TemplateFields::from_json(fields)?,
                },
                _ => {
                    return Err(Error::invalid(format!(
                        "{function} takes a template id and optional fields"
                    )));
                }
            },
            "request_card_by_template" => {
                let [template_id] = take(function, args)?;
                Self::RequestCard {
                    template_id: template_id.to_string(),
                }
            }
            "push_card_by_template" => {
                let [owner_id, template_id] = take(function, args)?;
                Self::PushCard {
                    owner_id: owner_id.to_string(),
                    template_id: template_id.to_string(),
                }
            }
            "create_batch_card_by_template" => {
                let [template_id, count] = take(function, args)?;
                Self::IssueBatch {
                    template_id: template_id.to_string(),
                    count: parse_count(count)?,
                }
            }
            "scrap_card" => {
                let [card_id] = take(function, args)?;
                Self::ScrapCard {
                    card_id: card_id.to_string(),
                }
            }
            "transfer_mp_consumer_to_consumer" => {
                let [money, point, source, receiver, target] = take(function, args)?;
                Self::TransferBalance(BalanceTransfer {
                    amounts: Amounts::parse(money, point)?,
                    source_card: source.to_string(),
                    receiver: receiver.to_string(),
                    target_card: target.to_string(),
                })
            }
            "deposit_mp_shop_to_consumer" => {
                let [money, point, receiver, target] = take(function, args)?;
                Self::Deposit(Deposit {
                    amounts: Amounts::parse(money, point)?,
                    receiver: receiver.to_string(),
                    target_card: target.to_string(),
                })
            }
            "spend_mp_consumer_to_shop" => {
                let [money, point, source, shop_id] = take(function, args)?;
                Self::Spend(Spend {
                    amounts: Amounts::parse(money, point)?,
                    source_card: source.to_string(),
                    shop_id: shop_id.to_string(),
                })
            }
            "get_users" => {
                take::<0>(function, args)?;
                Self::GetUsers
            }
            "get_shops" => {
                take::<0>(function, args)?;
                Self::GetShops
            }
            "get_cards" => {
                take::<0>(function, args)?;
                Self::GetCards
            }
            "get_card_templates" => {
                take::<0>(function, args)?;
                Self::GetCardTemplates
            }
            "get_user_detail" => {
                let [identity] = take(function, args)?;
                Self::GetUserDetail {
                    identity: identity.to_string(),
                }
            }
            "get_shop_detail" => {
                let [shop_id] = take(function, args)?;
                Self::GetShopDetail {
                    shop_id: shop_id.to_string(),
                }
            }
            "get_card_details" => {
                let [card_id] = take(function, args)?;
                Self::GetCardDetails {
                    card_id: card_id.to_string(),
                }
            }
            "get_shopLedger" => {
                let [shop_id, template_id] = take(function, args)?;
                Self::GetShopLedger {
                    shop_id: shop_id.to_string(),
                    template_id: template_id.to_string(),
                }
            }
            other => return Err(Error::invalid(format!("unknown function '{other}'"))),
        };
        Ok(command)
    }
}

impl Invocation {
    /// Parses a full invocation; `args[0]` is the caller.
    pub fn parse(function: &str, args: &[String]) -> Result<Self> {
        let Some((caller, rest)) = args.split_first() else {
            return Err(Error::invalid(format!("{function} needs a caller argument")));
        };
        if caller.trim().is_empty() {
            return Err(Error::invalid("caller identity is empty"));
        }
        Ok(Self {
            caller: caller.clone(),
            command: Command::parse(function, rest)?,
        })
    }
}
