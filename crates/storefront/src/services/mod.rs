//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, sign-in and sign-out through the gateway
//! - `session` - Session resolution (identity, role) and the route guard
//! - `catalog` - Shop item listing and admin CRUD
//! - `cart` - Per-user cart rows
//! - `item_form` - Admin item form state and validation

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod item_form;
pub mod session;

pub use auth::{AuthError, AuthService};
pub use cart::{CartOutcome, CartSync};
pub use catalog::CatalogSync;
pub use item_form::{FormError, FormSubmission, ItemForm, ItemFormFields};
pub use session::{
    AuthenticatedUser, GuardDecision, RequiredRole, ResolveError, Resolution, RouteGuard,
    SessionResolver,
};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::gateway::{GatewayError, Row, Table};

/// Errors from catalog and cart synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The gateway rejected or failed the operation.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A row could not be decoded into its model.
    #[error("malformed {table} row: {source}")]
    Malformed {
        table: Table,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    /// Short code for `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Gateway(GatewayError::Forbidden(_)) => "forbidden",
            Self::Gateway(GatewayError::TokenExpired) => "session_expired",
            Self::Gateway(GatewayError::NotFound) => "not_found",
            Self::Gateway(_) => "gateway",
            Self::Malformed { .. } => "malformed",
        }
    }
}

/// Decode gateway rows into models.
pub(crate) fn decode_rows<T: DeserializeOwned>(
    table: Table,
    rows: Vec<Row>,
) -> Result<Vec<T>, SyncError> {
    rows.into_iter().map(|row| decode_row(table, row)).collect()
}

/// Decode one gateway row into a model.
pub(crate) fn decode_row<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, SyncError> {
    serde_json::from_value(serde_json::Value::Object(row))
        .map_err(|source| SyncError::Malformed { table, source })
}
