//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Role-routed dashboard
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (gateway reachable)
//!
//! # Auth
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! GET  /register                  - Register page
//! POST /register                  - Register action
//! POST /api/auth/signout          - Sign out
//! GET  /api/auth/events           - Auth state stream (SSE)
//!
//! # Cart (requires sign-in)
//! POST /cart/add                  - Add item (quantity 1)
//! POST /cart/remove               - Remove item
//!
//! # Admin (requires admin role)
//! GET  /admin/items/new           - Dashboard with the create form open
//! GET  /admin/items/{id}/edit     - Dashboard with the edit form open
//! POST /admin/items               - Create item
//! POST /admin/items/{id}          - Update item
//! POST /admin/items/{id}/delete   - Delete item
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod events;
pub mod notice;

pub use notice::MessageQuery;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Create the auth routes router. Form posts are rate limited.
pub fn auth_routes(limiter: RateLimiterLayer) -> Router<AppState> {
    let submit = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(limiter);

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .merge(submit)
}

/// Create the `/api/auth` routes router.
pub fn auth_api_routes() -> Router<AppState> {
    Router::new()
        .route("/signout", post(auth::signout))
        .route("/events", get(events::auth_events))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(admin::create_item))
        .route("/items/new", get(admin::new_item))
        .route("/items/{id}", post(admin::update_item))
        .route("/items/{id}/edit", get(admin::edit_item))
        .route("/items/{id}/delete", post(admin::delete_item))
}

/// Create all routes for the storefront.
pub fn routes(auth_limiter: RateLimiterLayer, api_limiter: RateLimiterLayer) -> Router<AppState> {
    let mutations = Router::new()
        .nest("/cart", cart_routes())
        .nest("/admin", admin_routes())
        .layer(api_limiter);

    Router::new()
        .route("/", get(dashboard::index))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth_routes(auth_limiter))
        .nest("/api/auth", auth_api_routes())
        .merge(mutations)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the gateway is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.gateway().health().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "gateway health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
