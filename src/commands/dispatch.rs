//! Dispatch of parsed commands against the ledger.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{Command, Invocation};
use crate::core::CardLedger;
use crate::errors::{Error, Result};
use crate::store::LedgerStore;

fn payload<T: Serialize>(value: &T) -> Result<Option<Value>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| Error::invalid(format!("response encoding failed: {e}")))
}

/// Resolves the caller and runs one command.
///
/// Queries return their result as JSON; mutations return `None`.
#[instrument(skip_all, fields(function = invocation.command.name(), caller = %invocation.caller))]
pub async fn dispatch<S: LedgerStore>(
    ledger: &mut CardLedger<S>,
    invocation: Invocation,
) -> Result<Option<Value>> {
    let caller = ledger.resolve_caller(&invocation.caller).await?;
    let name = invocation.command.name();

    let result: Result<Option<Value>> = match invocation.command {
        Command::AddUser(user) => ledger.add_user(&caller, user).await.map(|()| None),
        Command::UpdateUser(user) => ledger.update_user(&caller, user).await.map(|()| None),
        Command::DeleteUser { identity } => {
            ledger.delete_user(&caller, &identity).await.map(|()| None)
        }
        Command::AddShop(shop) => ledger.add_shop(&caller, shop).await.map(|()| None),
        Command::UpdateShop(shop) => ledger.update_shop(&caller, shop).await.map(|()| None),
        Command::DeleteShop { shop_id } => {
            ledger.delete_shop(&caller, &shop_id).await.map(|()| None)
        }
        Command::CreateTemplate {
            template_id,
            fields,
        } => ledger
            .create_template(&caller, &template_id, fields)
            .await
            .map(|()| None),
        Command::RequestCard { template_id } => ledger
            .request_card(&caller, &template_id)
            .await
            .map(|_| None),
        Command::PushCard {
            owner_id,
            template_id,
        } => ledger
            .push_card(&caller, &owner_id, &template_id)
            .await
            .map(|_| None),
        Command::IssueBatch { template_id, count } => ledger
            .issue_batch(&caller, &template_id, count)
            .await
            .map(|_| None),
        Command::Transfer {
            kind,
            card_id,
            recipient,
        } => ledger
            .transfer(&caller, kind, &card_id, &recipient)
            .await
            .map(|()| None),
        Command::ScrapCard { card_id } => ledger.scrap_card(&caller, &card_id).await.map(|()| None),
        Command::UpdateField {
            field,
            card_id,
            value,
        } => ledger
            .update_card_field(&caller, field, &card_id, &value)
            .await
            .map(|()| None),
        Command::TransferBalance(t) => ledger
            .transfer_balance(&caller, t.amounts, &t.source_card, &t.receiver, &t.target_card)
            .await
            .map(|()| None),
        Command::Deposit(d) => ledger
            .deposit(&caller, d.amounts, &d.receiver, &d.target_card)
            .await
            .map(|()| None),
        Command::Spend(s) => ledger
            .spend(&caller, s.amounts, &s.source_card, &s.shop_id)
            .await
            .map(|()| None),
        Command::GetUsers => ledger.get_users().await.and_then(|u| payload(&u)),
        Command::GetUserDetail { identity } => ledger
            .get_user_detail(&identity)
            .await
            .and_then(|u| payload(&u)),
        Command::GetShops => ledger.get_shops().await.and_then(|s| payload(&s)),
        Command::GetShopDetail { shop_id } => ledger
            .get_shop_detail(&shop_id)
            .await
            .and_then(|s| payload(&s)),
        Command::GetCards => ledger.get_cards(&caller).await.and_then(|c| payload(&c)),
        Command::GetCardTemplates => ledger
            .get_card_templates(&caller)
            .await
            .and_then(|c| payload(&c)),
        Command::GetCardDetails { card_id } => ledger
            .get_card_details(&caller, &card_id)
            .await
            .and_then(|c| payload(&c)),
        Command::GetShopLedger {
            shop_id,
            template_id,
        } => ledger
            .get_shop_ledger(&caller, &shop_id, &template_id)
            .await
            .and_then(|l| payload(&l)),
    };

    match &result {
        Ok(_) => info!("{} completed for {}", name, caller.id),
        Err(e) => warn!("{} failed for {}: {}", name, caller.id, e),
    }
    result
}
