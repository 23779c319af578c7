//! ShopWave storefront library.
//!
//! Catalog, per-user cart, and a role-gated admin console. Identity, rows,
//! and row-level security live in a hosted auth/table gateway; this crate
//! resolves sessions, guards routes, and keeps views in sync with the
//! gateway's tables.
//!
//! The binary in `main.rs` wires configuration, logging, and Sentry around
//! [`build_router`]; tests drive the same router against the in-memory
//! gateway.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, http::Request};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{
    RateLimitConfigError, api_rate_limiter, auth_rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the full application router.
///
/// # Errors
///
/// Returns an error if the rate limiter settings are rejected.
pub fn build_router(state: AppState) -> Result<Router, RateLimitConfigError> {
    let session_layer = middleware::create_session_layer(state.config(), state.sessions().clone());

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    let router = Router::new()
        .merge(routes::routes(auth_rate_limiter()?, api_rate_limiter()?))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .with_state(state)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    Ok(router)
}

/// Serve the router until `shutdown` resolves.
///
/// Each connection carries its peer address, which keys the rate limiters
/// when no proxy header names the client.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::gateway::MemoryGateway;

    fn app() -> Router {
        let state = AppState::with_gateway(
            StorefrontConfig::for_tests(),
            Arc::new(MemoryGateway::new()),
        );
        build_router(state).unwrap()
    }

    #[tokio::test]
    async fn test_static_assets_are_cacheable() {
        let response = app()
            .oneshot(
                Request::get("/static/css/main.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app()
            .oneshot(Request::get("/products").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn sign_in_from(client: &reqwest::Client, base: &str) -> u16 {
        client
            .post(format!("{base}/login"))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body("email=ada%40example.com&password=wrong-password")
            .send()
            .await
            .unwrap()
            .status()
            .as_u16()
    }

    // Two loopback peers with no proxy headers get their own sign-in budgets.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_peers_without_proxy_headers_are_limited_separately() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, app(), async {
            let _ = stopped.await;
        }));

        let peer = |ip: [u8; 4]| {
            reqwest::Client::builder()
                .local_address(std::net::IpAddr::from(ip))
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap()
        };
        let base = format!("http://127.0.0.1:{port}");
        let first = peer([127, 0, 0, 1]);
        let second = peer([127, 0, 0, 2]);

        let mut statuses = Vec::new();
        for _ in 0..6 {
            statuses.push(sign_in_from(&first, &base).await);
        }
        assert_eq!(statuses, [303, 303, 303, 303, 303, 429]);

        assert_eq!(sign_in_from(&second, &base).await, 303);

        drop((first, second));
        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
