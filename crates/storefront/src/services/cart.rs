//! Cart synchronization.
//!
//! Cart rows are keyed by `(user_id, item_id)`. Adding an item the user already
//! has leaves a single row with quantity 1. Every operation needs a resolved
//! identity; without one it does nothing.

use tracing::instrument;

use shopwave_core::ShopItemId;

use super::{AuthenticatedUser, SyncError, decode_rows};
use crate::gateway::{Filter, Gateway, Query, Table, to_row};
use crate::models::{CartItem, NewCartItem};

/// Result of a cart operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOutcome<T> {
    /// The operation ran.
    Done(T),
    /// No signed-in user; nothing was sent to the gateway.
    Skipped,
}

/// Cart operations.
pub struct CartSync<'a> {
    gateway: &'a dyn Gateway,
}

impl<'a> CartSync<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn Gateway) -> Self {
        Self { gateway }
    }

    /// The user's cart rows with their items embedded.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the gateway fails or a row is malformed.
    #[instrument(skip_all)]
    pub async fn list_cart(
        &self,
        user: Option<&AuthenticatedUser>,
    ) -> Result<CartOutcome<Vec<CartItem>>, SyncError> {
        let Some(user) = user else {
            tracing::debug!("no signed-in user, skipping cart fetch");
            return Ok(CartOutcome::Skipped);
        };

        let query = Query::from(Table::CartItems)
            .eq("user_id", user.id.as_str())
            .order_asc("created_at")
            .embed(Table::ShopItems, "item_id");
        let rows = self
            .gateway
            .select(user.credential(), &query)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error fetching cart items"))?;
        Ok(CartOutcome::Done(decode_rows(Table::CartItems, rows)?))
    }

    /// Ensure `item_id` is in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the gateway rejects the upsert.
    #[instrument(skip(self, user))]
    pub async fn add_to_cart(
        &self,
        user: Option<&AuthenticatedUser>,
        item_id: &ShopItemId,
    ) -> Result<CartOutcome<()>, SyncError> {
        let Some(user) = user else {
            tracing::debug!("no signed-in user, skipping add to cart");
            return Ok(CartOutcome::Skipped);
        };

        let row = to_row(&NewCartItem::single(&user.id, item_id))?;
        self.gateway
            .upsert(
                user.credential(),
                Table::CartItems,
                row,
                &["user_id", "item_id"],
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error adding item to cart"))?;
        Ok(CartOutcome::Done(()))
    }

    /// Remove `item_id` from the user's cart. Removing an absent item is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the gateway rejects the delete.
    #[instrument(skip(self, user))]
    pub async fn remove_from_cart(
        &self,
        user: Option<&AuthenticatedUser>,
        item_id: &ShopItemId,
    ) -> Result<CartOutcome<()>, SyncError> {
        let Some(user) = user else {
            tracing::debug!("no signed-in user, skipping remove from cart");
            return Ok(CartOutcome::Skipped);
        };

        self.gateway
            .delete(
                user.credential(),
                Table::CartItems,
                &[
                    Filter::eq("user_id", user.id.as_str()),
                    Filter::eq("item_id", item_id.as_str()),
                ],
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error removing item from cart"))?;
        Ok(CartOutcome::Done(()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use shopwave_core::Price;

    use super::*;
    use crate::gateway::{Credential, MemoryGateway};
    use crate::models::ShopItemDraft;
    use crate::services::{AuthService, CatalogSync, Resolution, SessionResolver};

    async fn shopper(gateway: &MemoryGateway) -> AuthenticatedUser {
        let auth = AuthService::new(gateway);
        let password = SecretString::from("correct-horse");
        auth.register("shopper@example.com", &password).await.unwrap();
        let session = auth.login("shopper@example.com", &password).await.unwrap();
        match SessionResolver::new(gateway).authenticate(&session).await.unwrap() {
            Resolution::Authenticated(user) => user,
            Resolution::Unauthenticated => panic!("fresh session must authenticate"),
        }
    }

    async fn item(gateway: &MemoryGateway, name: &str) -> ShopItemId {
        let catalog = CatalogSync::new(gateway, Credential::Service);
        catalog
            .create_item(&ShopItemDraft {
                name: name.to_owned(),
                price: Price::from_cents(999),
                user_rating: None,
                in_stock: true,
            })
            .await
            .unwrap();
        catalog.list_items().await.unwrap().remove(0).id
    }

    #[tokio::test]
    async fn test_double_add_leaves_one_row() {
        let gateway = MemoryGateway::new();
        let user = shopper(&gateway).await;
        let mug = item(&gateway, "Mug").await;
        let cart = CartSync::new(&gateway);

        cart.add_to_cart(Some(&user), &mug).await.unwrap();
        cart.add_to_cart(Some(&user), &mug).await.unwrap();

        let CartOutcome::Done(rows) = cart.list_cart(Some(&user)).await.unwrap() else {
            panic!("expected cart rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity.get(), 1);
        assert_eq!(rows[0].item.as_ref().unwrap().name, "Mug");
    }

    #[tokio::test]
    async fn test_remove_absent_pair_is_noop() {
        let gateway = MemoryGateway::new();
        let user = shopper(&gateway).await;
        let mug = item(&gateway, "Mug").await;
        let lamp = item(&gateway, "Lamp").await;
        let cart = CartSync::new(&gateway);
        cart.add_to_cart(Some(&user), &mug).await.unwrap();

        let outcome = cart.remove_from_cart(Some(&user), &lamp).await.unwrap();
        assert_eq!(outcome, CartOutcome::Done(()));
        assert_eq!(gateway.rows(Table::CartItems).len(), 1);

        cart.remove_from_cart(Some(&user), &mug).await.unwrap();
        assert!(gateway.rows(Table::CartItems).is_empty());
    }

    #[tokio::test]
    async fn test_operations_without_user_are_skipped() {
        let gateway = MemoryGateway::new();
        let mug = item(&gateway, "Mug").await;
        let cart = CartSync::new(&gateway);

        assert_eq!(cart.add_to_cart(None, &mug).await.unwrap(), CartOutcome::Skipped);
        assert_eq!(
            cart.remove_from_cart(None, &mug).await.unwrap(),
            CartOutcome::Skipped
        );
        assert!(matches!(cart.list_cart(None).await.unwrap(), CartOutcome::Skipped));
        assert!(gateway.rows(Table::CartItems).is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_item_fails() {
        let gateway = MemoryGateway::new();
        let user = shopper(&gateway).await;
        let cart = CartSync::new(&gateway);

        let err = cart
            .add_to_cart(Some(&user), &ShopItemId::new("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "gateway");
    }
}
