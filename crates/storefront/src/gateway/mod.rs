//! Hosted auth/table gateway.
//!
//! All authentication and persistence goes through a [`Gateway`]: account
//! signup and password sign-in, session refresh, and row operations on the
//! `profiles`, `shop_items` and `cart_items` tables. Row-level security on the
//! hosted side decides what each credential may touch.
//!
//! # Implementations
//!
//! - [`SupabaseGateway`] - REST client for a Supabase project (GoTrue + `PostgREST`)
//! - `MemoryGateway` - in-process tables for tests (`test-support` feature)

mod events;
#[cfg(any(test, feature = "test-support"))]
mod memory;
mod supabase;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;

use shopwave_core::UserId;

pub use events::{AuthEvent, AuthEventKind, AuthEvents, AuthSubscription};
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryGateway, MemoryOp};
pub use supabase::SupabaseGateway;

/// A single table row as returned by the gateway.
pub type Row = serde_json::Map<String, Value>;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Email/password pair rejected.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Signup for an email that is already registered.
    #[error("user already registered")]
    UserAlreadyExists,

    /// Password rejected by the gateway's password policy.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Access token expired, revoked or unknown.
    #[error("session token expired or invalid")]
    TokenExpired,

    /// A single-row read matched nothing.
    #[error("row not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Row-level security denied the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Any other error payload from the gateway.
    #[error("gateway error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Gateway rate limit hit.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

// =============================================================================
// Tables and Queries
// =============================================================================

/// Tables the storefront reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// One row per account: `id` (auth user id) and `role`.
    Profiles,
    /// Catalog entries.
    ShopItems,
    /// `(user_id, item_id)` pairs with a quantity.
    CartItems,
}

impl Table {
    /// Table name as exposed by the gateway.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::ShopItems => "shop_items",
            Self::CartItems => "cart_items",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filter on a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

impl Filter {
    /// `column = value`
    #[must_use]
    pub fn eq(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// Foreign row embedded into each result row under the foreign table's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embed {
    pub table: Table,
    /// Column on the queried table referencing the foreign table's `id`.
    pub foreign_key: &'static str,
}

/// A read against one table.
#[derive(Debug, Clone)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub embed: Option<Embed>,
}

impl Query {
    /// Select every visible row of `table`.
    #[must_use]
    pub const fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            embed: None,
        }
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Order descending by `column`.
    #[must_use]
    pub const fn order_desc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            ascending: false,
        });
        self
    }

    /// Order ascending by `column`.
    #[must_use]
    pub const fn order_asc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            ascending: true,
        });
        self
    }

    /// Embed the row of `table` referenced by `foreign_key`.
    #[must_use]
    pub const fn embed(mut self, table: Table, foreign_key: &'static str) -> Self {
        self.embed = Some(Embed { table, foreign_key });
        self
    }
}

// =============================================================================
// Credentials and Sessions
// =============================================================================

/// Which credential a table operation runs under.
#[derive(Clone, Copy)]
pub enum Credential<'a> {
    /// Public anon key only.
    Anon,
    /// A signed-in user's access token; row-level security applies.
    User(&'a SecretString),
    /// Service-role key; bypasses row-level security.
    Service,
}

impl std::fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anon => f.write_str("Anon"),
            Self::User(_) => f.write_str("User([REDACTED])"),
            Self::Service => f.write_str("Service"),
        }
    }
}

/// Authenticated identity as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
}

/// Token pair issued by sign-in or refresh.
#[derive(Clone)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub user: Identity,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Outcome of a signup.
///
/// `session` is `None` when the gateway requires email confirmation before
/// the first sign-in.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub identity: Identity,
    pub session: Option<AuthSession>,
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Operations the storefront needs from the hosted backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Create an account.
    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<SignUp, GatewayError>;

    /// Exchange an email/password pair for a session.
    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, GatewayError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), GatewayError>;

    /// Resolve the identity behind `access_token`.
    ///
    /// Returns `Err(GatewayError::TokenExpired)` for an expired or revoked token.
    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, GatewayError>;

    /// Auth state change notifications.
    fn auth_events(&self) -> &AuthEvents;

    /// Read rows.
    async fn select(&self, cred: Credential<'_>, query: &Query) -> Result<Vec<Row>, GatewayError>;

    /// Read exactly one row; `Err(GatewayError::NotFound)` if none matched.
    async fn select_single(&self, cred: Credential<'_>, query: &Query)
    -> Result<Row, GatewayError>;

    /// Insert one row.
    async fn insert(&self, cred: Credential<'_>, table: Table, row: Row)
    -> Result<(), GatewayError>;

    /// Patch every row matching `filters`.
    async fn update(
        &self,
        cred: Credential<'_>,
        table: Table,
        filters: &[Filter],
        patch: Row,
    ) -> Result<(), GatewayError>;

    /// Delete every row matching `filters`.
    async fn delete(
        &self,
        cred: Credential<'_>,
        table: Table,
        filters: &[Filter],
    ) -> Result<(), GatewayError>;

    /// Insert `row`, or merge it into the row that matches on `on_conflict`.
    async fn upsert(
        &self,
        cred: Credential<'_>,
        table: Table,
        row: Row,
        on_conflict: &[&'static str],
    ) -> Result<(), GatewayError>;

    /// Check that the gateway is reachable.
    async fn health(&self) -> Result<(), GatewayError>;
}

/// Serialize a value into a [`Row`].
///
/// # Errors
///
/// Returns `GatewayError::Parse` if `value` does not serialize to a JSON object.
pub fn to_row<T: serde::Serialize>(value: &T) -> Result<Row, GatewayError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(GatewayError::Api {
            status: 0,
            code: "not_an_object".to_owned(),
            message: format!("expected a JSON object, got {other}"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::from(Table::CartItems)
            .eq("user_id", "u-1")
            .order_desc("created_at")
            .embed(Table::ShopItems, "item_id");

        assert_eq!(query.table.as_str(), "cart_items");
        assert_eq!(query.filters, vec![Filter::eq("user_id", "u-1")]);
        assert_eq!(
            query.order,
            Some(Order {
                column: "created_at",
                ascending: false
            })
        );
        assert_eq!(query.embed.unwrap().table, Table::ShopItems);
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let token = SecretString::from("very-secret-token");
        let debug = format!("{:?}", Credential::User(&token));
        assert!(!debug.contains("very-secret-token"));
    }

    #[test]
    fn test_to_row_requires_object() {
        #[derive(serde::Serialize)]
        struct Patch {
            name: &'static str,
        }

        let row = to_row(&Patch { name: "Lamp" }).unwrap();
        assert_eq!(row.get("name").unwrap(), "Lamp");
        assert!(to_row(&42).is_err());
    }
}
