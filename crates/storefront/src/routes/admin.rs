//! Admin item management.
//!
//! The item form is shown on top of the admin dashboard. Opening it is a GET;
//! submitting posts the fields, and a rejected submission re-renders the
//! dashboard with the form still open.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use shopwave_core::ShopItemId;

use super::MessageQuery;
use super::dashboard::render;
use crate::error::add_breadcrumb;
use crate::middleware::RequireAdmin;
use crate::services::{
    AuthenticatedUser, CatalogSync, FormSubmission, ItemForm, ItemFormFields, SyncError,
};
use crate::state::AppState;

fn sync_failed(error: &SyncError) -> Response {
    Redirect::to(&format!("/?error={}", error.code())).into_response()
}

/// Open the form for a new item.
#[instrument(skip_all)]
pub async fn new_item(State(state): State<AppState>, RequireAdmin(admin): RequireAdmin) -> Response {
    let form = ItemForm::open_for_create();
    render(&state, &admin, &form, None, &MessageQuery::default())
        .await
        .into_response()
}

/// Open the form pre-populated with a stored item.
#[instrument(skip(state, admin))]
pub async fn edit_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ShopItemId>,
) -> Response {
    let item = match CatalogSync::new(state.gateway(), admin.credential())
        .get_item(&id)
        .await
    {
        Ok(item) => item,
        Err(e) => return sync_failed(&e),
    };

    let form = ItemForm::open_for_edit(&item);
    render(&state, &admin, &form, None, &MessageQuery::default())
        .await
        .into_response()
}

/// Create an item from the submitted form.
#[instrument(skip(state, admin, fields))]
pub async fn create_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(fields): Form<ItemFormFields>,
) -> Response {
    let form = ItemForm::open_for_create().with_fields(fields);
    submit(&state, &admin, form).await
}

/// Update an item from the submitted form.
#[instrument(skip(state, admin, fields))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ShopItemId>,
    Form(fields): Form<ItemFormFields>,
) -> Response {
    let form = ItemForm::Editing { id, fields };
    submit(&state, &admin, form).await
}

async fn submit(state: &AppState, admin: &AuthenticatedUser, mut form: ItemForm) -> Response {
    let submission = match form.submit() {
        Ok(submission) => submission,
        Err(e) => {
            tracing::debug!(error = %e, "item form rejected");
            let page = render(state, admin, &form, Some(&e), &MessageQuery::default()).await;
            return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
        }
    };

    let catalog = CatalogSync::new(state.gateway(), admin.credential());
    let (result, success) = match &submission {
        FormSubmission::Create(draft) => (catalog.create_item(draft).await, "created"),
        FormSubmission::Update(id, draft) => (catalog.update_item(id, draft).await, "updated"),
    };

    match result {
        Ok(()) => {
            add_breadcrumb("admin", success, None);
            Redirect::to(&format!("/?success={success}")).into_response()
        }
        Err(e) => sync_failed(&e),
    }
}

/// Delete an item. Cart rows pointing at it go with it.
#[instrument(skip(state, admin))]
pub async fn delete_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ShopItemId>,
) -> Response {
    match CatalogSync::new(state.gateway(), admin.credential())
        .delete_item(&id)
        .await
    {
        Ok(()) => Redirect::to("/?success=deleted").into_response(),
        Err(e) => sync_failed(&e),
    }
}
