//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions over `SessionMemoryStore`)
//! 5. Security headers (CSP, frame and isolation policies)
//! 6. Rate limiting (governor, per route group)
//!
//! Authentication is not a layer: handlers take the `RequireUser`,
//! `RequireAdmin` or `OptionalUser` extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, OptionalUser, RequireAdmin, RequireUser, clear_gateway_session,
    get_gateway_session, persist_refresh, set_gateway_session,
};
pub use rate_limit::{RateLimitConfigError, RateLimiterLayer, api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{
    SESSION_PURGE_INTERVAL, SessionMemoryStore, create_session_layer, purge_expired_sessions,
};
