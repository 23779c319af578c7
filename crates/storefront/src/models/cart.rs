//! Cart rows.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopwave_core::{CartItemId, ShopItemId, UserId};

use super::ShopItem;

/// A `(user, item)` pair in `cart_items`, with the referenced item embedded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub item_id: ShopItemId,
    pub quantity: NonZeroU32,
    pub created_at: DateTime<Utc>,
    /// `None` when the embedded row is not visible to the caller.
    #[serde(rename = "shop_items", default)]
    pub item: Option<ShopItem>,
}

/// Row written when an item is added to a cart.
#[derive(Debug, Clone, Serialize)]
pub struct NewCartItem<'a> {
    pub user_id: &'a UserId,
    pub item_id: &'a ShopItemId,
    pub quantity: NonZeroU32,
}

impl<'a> NewCartItem<'a> {
    /// A single unit of `item_id` for `user_id`.
    #[must_use]
    pub const fn single(user_id: &'a UserId, item_id: &'a ShopItemId) -> Self {
        Self {
            user_id,
            item_id,
            quantity: NonZeroU32::MIN,
        }
    }
}
