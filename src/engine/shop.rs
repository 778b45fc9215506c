//! Shop catalog items and the unlock/purchase operation.
//!
//! Purchases debit spendable coins without touching lifetime earnings; the
//! coin-collector objective reconstructs lifetime holdings from the balance
//! plus the cost of everything owned.

use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::catalog::TemplateCatalog;
use crate::engine::errors::{EngineError, Rejection};
use crate::engine::storage::Store;
use crate::engine::types::UserRecord;

/// An item purchasable from the static shop catalog, at most once per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: i64,
}

impl ShopItem {
    pub fn new(id: &str, name: &str, cost: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            cost,
        }
    }
}

/// Purchase `item_id` for `user_id`: the item must exist in the catalog,
/// must not already be owned, and the user must be able to afford it. On
/// success the cost is debited and the item lands in the inventory. No
/// reward or streak interaction.
pub fn purchase_item(
    store: &Store,
    catalog: &TemplateCatalog,
    user_id: &str,
    item_id: &str,
) -> Result<UserRecord, EngineError> {
    let guard = store.user_guard(user_id);
    let _held = guard
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    let item = catalog
        .shop_items
        .get(item_id)
        .ok_or_else(|| Rejection::UnknownTemplate(item_id.to_string()))?;

    let mut user = store.ensure_user(user_id)?;
    if user.owns_item(item_id) {
        return Err(Rejection::AlreadyPurchased.into());
    }
    if user.coins < item.cost {
        return Err(Rejection::InsufficientFunds.into());
    }

    user.coins -= item.cost;
    user.inventory.push(item_id.to_string());
    store.put_user(user.clone())?;
    info!("{} unlocked shop item {}", user_id, item_id);
    Ok(user)
}

/// Sum of catalog costs of everything the user owns. Items absent from the
/// catalog (the starter "default" entry) count as zero.
pub fn owned_inventory_value(user: &UserRecord, catalog: &TemplateCatalog) -> i64 {
    user.inventory
        .iter()
        .filter_map(|id| catalog.shop_items.get(id))
        .map(|item| item.cost)
        .sum()
}
