//! Catalog synchronization.
//!
//! Reads and admin writes on `shop_items`. Writes do not patch any local
//! state; callers redirect and list again to observe the change.

use tracing::instrument;

use shopwave_core::ShopItemId;

use super::{SyncError, decode_row, decode_rows};
use crate::gateway::{Credential, Filter, Gateway, Query, Table, to_row};
use crate::models::{ShopItem, ShopItemDraft};

/// Catalog operations under one credential.
pub struct CatalogSync<'a> {
    gateway: &'a dyn Gateway,
    credential: Credential<'a>,
}

impl<'a> CatalogSync<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn Gateway, credential: Credential<'a>) -> Self {
        Self {
            gateway,
            credential,
        }
    }

    /// All items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the gateway fails or a row is malformed.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<ShopItem>, SyncError> {
        let query = Query::from(Table::ShopItems).order_desc("created_at");
        let rows = self
            .gateway
            .select(self.credential, &query)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error fetching items"))?;
        decode_rows(Table::ShopItems, rows)
    }

    /// One item by id.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Gateway(GatewayError::NotFound)` if no item has this id.
    #[instrument(skip(self))]
    pub async fn get_item(&self, id: &ShopItemId) -> Result<ShopItem, SyncError> {
        let query = Query::from(Table::ShopItems).eq("id", id.as_str());
        let row = self.gateway.select_single(self.credential, &query).await?;
        decode_row(Table::ShopItems, row)
    }

    /// Insert a new item.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the gateway rejects the insert.
    #[instrument(skip(self))]
    pub async fn create_item(&self, draft: &ShopItemDraft) -> Result<(), SyncError> {
        self.gateway
            .insert(self.credential, Table::ShopItems, to_row(draft)?)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error creating item"))?;
        tracing::info!(name = %draft.name, "item created");
        Ok(())
    }

    /// Replace the editable fields of an item.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the gateway rejects the update.
    #[instrument(skip(self))]
    pub async fn update_item(&self, id: &ShopItemId, draft: &ShopItemDraft) -> Result<(), SyncError> {
        self.gateway
            .update(
                self.credential,
                Table::ShopItems,
                &[Filter::eq("id", id.as_str())],
                to_row(draft)?,
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error updating item"))?;
        tracing::info!("item updated");
        Ok(())
    }

    /// Delete an item by id.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the gateway rejects the delete.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: &ShopItemId) -> Result<(), SyncError> {
        self.gateway
            .delete(
                self.credential,
                Table::ShopItems,
                &[Filter::eq("id", id.as_str())],
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error deleting item"))?;
        tracing::info!("item deleted");
        Ok(())
    }
}
