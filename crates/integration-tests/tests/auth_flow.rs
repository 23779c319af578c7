//! Registration, sign-in and sign-out against the full router.

use axum::http::StatusCode;

use shopwave_core::Role;
use shopwave_integration_tests::{PASSWORD, TestApp};
use shopwave_storefront::gateway::{MemoryOp, Table};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let live = browser.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    assert_eq!(browser.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_requires_sign_in() {
    let app = TestApp::new();
    let mut browser = app.browser();

    assert!(browser.get("/").await.redirects_to("/login"));
}

#[tokio::test]
async fn test_registration_creates_user_profile() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let response = browser.register("new@example.com", PASSWORD).await;
    assert!(response.redirects_to("/login?success=registered"));
    assert!(!browser.has_session());

    let user_id = app.user_id("new@example.com");
    let profile = app.profile(&user_id).expect("profile row");
    assert_eq!(profile.role, Role::User);

    let login_page = browser.get("/login?success=registered").await;
    assert!(login_page.body.contains("Registration successful"));
}

#[tokio::test]
async fn test_registration_errors_return_to_form() {
    let app = TestApp::new();
    let mut browser = app.browser();

    assert!(
        browser
            .register("not-an-email", PASSWORD)
            .await
            .redirects_to("/register?error=invalid_email")
    );
    assert!(
        browser
            .register("short@example.com", "abc")
            .await
            .redirects_to("/register?error=weak_password")
    );

    browser.register("taken@example.com", PASSWORD).await;
    assert!(
        browser
            .register("taken@example.com", PASSWORD)
            .await
            .redirects_to("/register?error=exists")
    );
}

#[tokio::test]
async fn test_login_with_wrong_password_is_rejected() {
    let app = TestApp::new();
    let mut browser = app.browser();
    browser.register("a@example.com", PASSWORD).await;

    let response = browser.login("a@example.com", "not-the-password").await;
    assert!(response.redirects_to("/login?error=credentials"));
    assert!(!browser.has_session());
}

#[tokio::test]
async fn test_login_shows_customer_dashboard() {
    let app = TestApp::new();
    let mut browser = app.signed_in("shopper@example.com").await;

    let page = browser.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Customer Dashboard"));
    assert!(page.body.contains("shopper@example.com"));
    assert!(page.body.contains("Your cart is empty."));

    // Signed-in users skip the auth pages.
    assert!(browser.get("/login").await.redirects_to("/"));
    assert!(browser.get("/register").await.redirects_to("/"));
}

#[tokio::test]
async fn test_signout_ends_session() {
    let app = TestApp::new();
    let mut browser = app.signed_in("leaving@example.com").await;

    let response = browser.signout().await;
    assert!(response.redirects_to("/login?success=signed_out"));

    assert!(browser.get("/").await.redirects_to("/login"));
}

#[tokio::test]
async fn test_revoked_session_returns_to_login() {
    let app = TestApp::new();
    let mut browser = app.signed_in("revoked@example.com").await;

    app.gateway
        .revoke_sessions(&app.user_id("revoked@example.com"));

    assert!(browser.get("/").await.redirects_to("/login"));
    assert!(browser.get("/").await.redirects_to("/login"));
}

#[tokio::test]
async fn test_refreshed_tokens_are_kept_between_requests() {
    let app = TestApp::new();
    let mut browser = app.signed_in("refresh@example.com").await;
    let user_id = app.user_id("refresh@example.com");

    // Refresh tokens are single use: the second expiry only recovers if the
    // first refresh was written back to the session.
    app.gateway.expire_access_tokens(&user_id);
    let first = browser.get("/").await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains("refresh@example.com"));

    app.gateway.expire_access_tokens(&user_id);
    let second = browser.get("/").await;
    assert_eq!(second.status, StatusCode::OK);
    assert!(second.body.contains("refresh@example.com"));
}

#[tokio::test]
async fn test_profile_outage_shows_retry_page() {
    let app = TestApp::new();
    let mut browser = app.signed_in("outage@example.com").await;

    app.gateway
        .fail_next(Table::Profiles, MemoryOp::Select, "connection reset by peer");
    let page = browser.get("/").await;
    assert_eq!(page.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(page.body.contains("We could not load your account right now."));
    assert!(page.body.contains("Try again"));
    assert!(!page.body.contains("connection reset"));

    // The session survives, so retrying works once the gateway recovers.
    assert_eq!(browser.get("/").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_events_require_sign_in() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let response = browser.get("/api/auth/events").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers_on_pages() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let page = browser.get("/login").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.header("x-frame-options"), Some("DENY"));
    assert_eq!(page.header("cache-control"), Some("no-store, max-age=0"));
    assert!(page.header("content-security-policy").is_some());
    assert!(page.header("x-request-id").is_some());
}
