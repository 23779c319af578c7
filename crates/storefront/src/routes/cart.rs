//! Cart route handlers.
//!
//! Each mutation redirects back to the dashboard, which re-reads the cart.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use shopwave_core::ShopItemId;

use crate::error::add_breadcrumb;
use crate::middleware::RequireUser;
use crate::services::{CartOutcome, CartSync, SyncError};
use crate::state::AppState;

/// Cart mutation form data.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    pub item_id: String,
}

impl CartItemForm {
    fn item_id(&self) -> Option<ShopItemId> {
        let id = self.item_id.trim();
        (!id.is_empty()).then(|| ShopItemId::new(id))
    }
}

fn done(result: Result<CartOutcome<()>, SyncError>, success: &str) -> Response {
    match result {
        Ok(CartOutcome::Done(())) => Redirect::to(&format!("/?success={success}")).into_response(),
        Ok(CartOutcome::Skipped) => Redirect::to("/login").into_response(),
        Err(e) => Redirect::to(&format!("/?error={}", e.code())).into_response(),
    }
}

/// Add an item to the cart (quantity stays at 1).
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<CartItemForm>,
) -> Response {
    let Some(item_id) = form.item_id() else {
        return Redirect::to("/?error=invalid_item").into_response();
    };

    add_breadcrumb("cart", "Add to cart", Some(&[("item_id", item_id.as_str())]));
    let result = CartSync::new(state.gateway())
        .add_to_cart(Some(&user), &item_id)
        .await;
    done(result, "added")
}

/// Remove an item from the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<CartItemForm>,
) -> Response {
    let Some(item_id) = form.item_id() else {
        return Redirect::to("/?error=invalid_item").into_response();
    };

    add_breadcrumb(
        "cart",
        "Remove from cart",
        Some(&[("item_id", item_id.as_str())]),
    );
    let result = CartSync::new(state.gateway())
        .remove_from_cart(Some(&user), &item_id)
        .await;
    done(result, "removed")
}
