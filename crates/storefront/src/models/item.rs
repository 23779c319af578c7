//! Catalog items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopwave_core::{Price, Rating, ShopItemId};

/// A catalog entry as stored in `shop_items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: ShopItemId,
    pub name: String,
    pub price: Price,
    /// Average rating, absent until someone rates the item.
    #[serde(default)]
    pub user_rating: Option<Rating>,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ShopItem {
    /// Rating for display: one decimal place, or `N/A` when unrated.
    #[must_use]
    pub fn rating_label(&self) -> String {
        self.user_rating
            .map_or_else(|| "N/A".to_owned(), |rating| rating.to_string())
    }

    /// Stock status for display.
    #[must_use]
    pub const fn stock_label(&self) -> &'static str {
        if self.in_stock { "Yes" } else { "No" }
    }
}

/// Validated field values for creating or replacing a catalog entry.
///
/// Serializes with explicit `null` for a missing rating so an update clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItemDraft {
    pub name: String,
    pub price: Price,
    pub user_rating: Option<Rating>,
    pub in_stock: bool,
}

impl From<&ShopItem> for ShopItemDraft {
    fn from(item: &ShopItem) -> Self {
        Self {
            name: item.name.clone(),
            price: item.price,
            user_rating: item.user_rating,
            in_stock: item.in_stock,
        }
    }
}
