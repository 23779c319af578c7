//! Integration tests for ShopWave.
//!
//! Tests drive the full storefront router in process, against the in-memory
//! gateway, so no hosted project or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopwave-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - registration, sign-in, sign-out, health
//! - `cart` - per-user cart mutations
//! - `admin` - role guard and catalog management

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use shopwave_core::{Role, ShopItemId, UserId};
use shopwave_storefront::build_router;
use shopwave_storefront::config::StorefrontConfig;
use shopwave_storefront::gateway::{Credential, Gateway, MemoryGateway, Row, Table, to_row};
use shopwave_storefront::models::{Profile, ShopItem, ShopItemDraft};
use shopwave_storefront::services::CatalogSync;
use shopwave_storefront::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "correct-horse";

const BODY_LIMIT: usize = 1024 * 1024;

/// The storefront router wired to an in-memory gateway.
pub struct TestApp {
    router: Router,
    pub gateway: Arc<MemoryGateway>,
    next_client: AtomicU8,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// # Panics
    ///
    /// Panics if the router cannot be built.
    #[must_use]
    pub fn new() -> Self {
        let gateway = Arc::new(MemoryGateway::new());
        let state = AppState::with_gateway(StorefrontConfig::for_tests(), gateway.clone());
        let router = build_router(state).expect("rate limiter settings");
        Self {
            router,
            gateway,
            next_client: AtomicU8::new(1),
        }
    }

    /// A fresh browser with no cookies.
    ///
    /// Each browser reports its own client IP so rate limits do not leak
    /// between them.
    pub fn browser(&self) -> Browser<'_> {
        let n = self.next_client.fetch_add(1, Ordering::Relaxed);
        Browser {
            app: self,
            client_ip: format!("203.0.113.{n}"),
            cookie: None,
        }
    }

    /// Register `email` and return a browser signed in as them.
    ///
    /// # Panics
    ///
    /// Panics if registration or sign-in is rejected.
    pub async fn signed_in(&self, email: &str) -> Browser<'_> {
        let mut browser = self.browser();
        let registered = browser.register(email, PASSWORD).await;
        assert_eq!(
            registered.location.as_deref(),
            Some("/login?success=registered")
        );
        let login = browser.login(email, PASSWORD).await;
        assert_eq!(login.location.as_deref(), Some("/"), "login failed for {email}");
        browser
    }

    /// Register `email`, promote it to admin, and return a signed-in browser.
    ///
    /// # Panics
    ///
    /// Panics if any step is rejected.
    pub async fn signed_in_admin(&self, email: &str) -> Browser<'_> {
        let browser = self.signed_in(email).await;
        let user_id = self.user_id(email);
        self.set_role(&user_id, Role::Admin).await;
        browser
    }

    /// # Panics
    ///
    /// Panics if no account exists for `email`.
    #[must_use]
    pub fn user_id(&self, email: &str) -> UserId {
        self.gateway.user_id(email).expect("account exists")
    }

    /// Change a role the way the admin CLI does.
    ///
    /// # Panics
    ///
    /// Panics if the gateway rejects the upsert.
    pub async fn set_role(&self, user_id: &UserId, role: Role) {
        let row = to_row(&Profile {
            id: user_id.clone(),
            role,
        })
        .expect("profile row");
        self.gateway
            .upsert(Credential::Service, Table::Profiles, row, &["id"])
            .await
            .expect("role upsert");
    }

    /// Insert an in-stock, unrated catalog item and return its id.
    ///
    /// # Panics
    ///
    /// Panics if `price` is invalid or the insert is rejected.
    pub async fn add_item(&self, name: &str, price: &str) -> ShopItemId {
        let draft = ShopItemDraft {
            name: name.to_owned(),
            price: price.parse().expect("valid price"),
            user_rating: None,
            in_stock: true,
        };
        CatalogSync::new(self.gateway.as_ref(), Credential::Service)
            .create_item(&draft)
            .await
            .expect("item insert");

        self.items()
            .into_iter()
            .find(|item| item.name == name)
            .map(|item| item.id)
            .expect("inserted item")
    }

    /// Cart rows belonging to `user_id`.
    #[must_use]
    pub fn cart_rows(&self, user_id: &UserId) -> Vec<Row> {
        self.rows(Table::CartItems)
            .into_iter()
            .filter(|row| row.get("user_id").and_then(Value::as_str) == Some(user_id.as_str()))
            .collect()
    }

    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.gateway.rows(table)
    }

    /// Catalog rows decoded into models.
    ///
    /// # Panics
    ///
    /// Panics if a stored row does not decode.
    #[must_use]
    pub fn items(&self) -> Vec<ShopItem> {
        self.rows(Table::ShopItems)
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).expect("shop item row"))
            .collect()
    }

    /// Profile row for `user_id`, if one exists.
    #[must_use]
    pub fn profile(&self, user_id: &UserId) -> Option<Profile> {
        self.rows(Table::Profiles)
            .into_iter()
            .map(|row| serde_json::from_value::<Profile>(Value::Object(row)))
            .find_map(|profile| profile.ok().filter(|p| &p.id == user_id))
    }
}

/// One cookie jar talking to the [`TestApp`].
pub struct Browser<'a> {
    app: &'a TestApp,
    client_ip: String,
    cookie: Option<String>,
}

/// What a browser sees from one request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl Browser<'_> {
    /// # Panics
    ///
    /// Panics if the router fails to respond.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty());
        self.send(request.expect("request")).await
    }

    /// POST an urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the router fails to respond.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body));
        self.send(request.expect("request")).await
    }

    pub async fn register(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/register", &[("email", email), ("password", password)])
            .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }

    pub async fn signout(&mut self) -> TestResponse {
        self.post_form("/api/auth/signout", &[]).await
    }

    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("x-forwarded-for", &self.client_ip);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        for value in response.headers().get_all(header::SET_COOKIE) {
            self.store_cookie(value);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let location = header_text(headers.get(header::LOCATION));
        let bytes = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
            .await
            .expect("response body");

        TestResponse {
            status,
            location,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn store_cookie(&mut self, value: &HeaderValue) {
        let Ok(raw) = value.to_str() else { return };
        let pair = raw.split(';').next().unwrap_or_default().trim();
        let Some((_, session_id)) = pair.split_once('=') else {
            return;
        };
        let expired = raw.to_ascii_lowercase().contains("max-age=0");
        self.cookie = if session_id.is_empty() || expired {
            None
        } else {
            Some(pair.to_owned())
        };
    }
}

fn header_text(value: Option<&HeaderValue>) -> Option<String> {
    value.and_then(|v| v.to_str().ok()).map(str::to_owned)
}

/// Minimal `application/x-www-form-urlencoded` encoding.
fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

impl TestResponse {
    /// Whether the response is a redirect to exactly `target`.
    #[must_use]
    pub fn redirects_to(&self, target: &str) -> bool {
        self.status.is_redirection() && self.location.as_deref() == Some(target)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
