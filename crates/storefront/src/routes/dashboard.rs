//! Role-routed dashboard.
//!
//! `/` resolves identity and role on every request. Admins see the item
//! table (and the item form when one of the admin routes opened it);
//! everyone else sees the catalog and their cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::{MessageQuery, notice};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{clear_gateway_session, get_gateway_session, persist_refresh};
use crate::models::{CartItem, ShopItem};
use crate::services::{
    AuthenticatedUser, CartOutcome, CartSync, CatalogSync, FormError, ItemForm, Resolution,
    SessionResolver,
};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Shop item display data.
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub rating: String,
    pub in_stock: &'static str,
}

impl From<&ShopItem> for ItemView {
    fn from(item: &ShopItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            price: item.price.to_string(),
            rating: item.rating_label(),
            in_stock: item.stock_label(),
        }
    }
}

/// Cart row display data. The item may have been deleted since it was added.
pub struct CartItemView {
    pub item_id: String,
    pub name: String,
    pub price: String,
    pub quantity: u32,
}

impl From<&CartItem> for CartItemView {
    fn from(row: &CartItem) -> Self {
        Self {
            item_id: row.item_id.to_string(),
            name: row
                .item
                .as_ref()
                .map_or_else(|| "Unknown Item".to_owned(), |item| item.name.clone()),
            price: row
                .item
                .as_ref()
                .map_or_else(|| "N/A".to_owned(), |item| item.price.to_string()),
            quantity: row.quantity.get(),
        }
    }
}

/// Admin item form display data.
pub struct ItemFormView {
    pub title: &'static str,
    pub action: String,
    pub name: String,
    pub price: String,
    pub user_rating: String,
    pub in_stock: bool,
    pub error: Option<String>,
}

impl ItemFormView {
    fn new(form: &ItemForm, error: Option<&FormError>) -> Option<Self> {
        let fields = form.fields()?;
        Some(Self {
            title: form.title(),
            action: form.action(),
            name: fields.name.clone(),
            price: fields.price.clone(),
            user_rating: fields.user_rating.clone(),
            in_stock: fields.in_stock,
            error: error.map(ToString::to_string),
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub email: String,
    pub is_admin: bool,
    pub items: Vec<ItemView>,
    pub cart: Vec<CartItemView>,
    pub form: Option<ItemFormView>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

impl DashboardTemplate {
    #[must_use]
    pub const fn title(&self) -> &'static str {
        if self.is_admin {
            "Admin Dashboard"
        } else {
            "Customer Dashboard"
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Load everything the dashboard shows for `user`.
///
/// Load failures become the page's error notice rather than a failed request.
pub(super) async fn render(
    state: &AppState,
    user: &AuthenticatedUser,
    form: &ItemForm,
    form_error: Option<&FormError>,
    query: &MessageQuery,
) -> DashboardTemplate {
    let mut load_error = None;

    let items = match CatalogSync::new(state.gateway(), user.credential())
        .list_items()
        .await
    {
        Ok(items) => items.iter().map(ItemView::from).collect(),
        Err(e) => {
            load_error = Some(notice::error_text(e.code()));
            Vec::new()
        }
    };

    let is_admin = user.is_admin();
    let cart = if is_admin {
        Vec::new()
    } else {
        match CartSync::new(state.gateway()).list_cart(Some(user)).await {
            Ok(CartOutcome::Done(rows)) => rows.iter().map(CartItemView::from).collect(),
            Ok(CartOutcome::Skipped) => Vec::new(),
            Err(e) => {
                load_error = load_error.or(Some(notice::error_text(e.code())));
                Vec::new()
            }
        }
    };

    DashboardTemplate {
        email: user.email.clone(),
        is_admin,
        items,
        cart,
        form: if is_admin {
            ItemFormView::new(form, form_error)
        } else {
            None
        },
        error: load_error.or_else(|| query.error_text()),
        success: query.success_text(),
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display the dashboard for the signed-in user.
///
/// # Errors
///
/// Fails with a retry page when identity or role cannot be resolved.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
) -> Result<Response, AppError> {
    let Some(stored) = get_gateway_session(&session).await else {
        return Ok(Redirect::to("/login").into_response());
    };

    let resolver = SessionResolver::new(state.gateway());
    let mut user = match resolver.authenticate(&stored).await? {
        Resolution::Authenticated(user) => user,
        Resolution::Unauthenticated => {
            clear_gateway_session(&session).await?;
            return Ok(Redirect::to("/login").into_response());
        }
    };
    // Before the role lookup, so a failure there keeps the new tokens.
    persist_refresh(&session, &user).await;

    user.role = Some(resolver.role_for(&user).await?);

    Ok(render(&state, &user, &ItemForm::Closed, None, &query)
        .await
        .into_response())
}
