//! Supabase REST client.
//!
//! Auth goes to GoTrue under `/auth/v1`, table operations go to `PostgREST`
//! under `/rest/v1`. Every request carries the project's anon key as `apikey`;
//! the bearer token is the user's access token or the key itself.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use shopwave_core::UserId;

use super::{
    AuthEventKind, AuthEvents, AuthSession, Credential, Filter, Gateway, GatewayError, Identity,
    Query, Row, SignUp, Table,
};
use crate::config::GatewayConfig;

/// Return a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// `PostgREST` code for "zero rows where exactly one was expected".
const PGRST_NO_ROWS: &str = "PGRST116";
/// `PostgREST` code for an expired JWT.
const PGRST_JWT_EXPIRED: &str = "PGRST301";
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

// =============================================================================
// SupabaseGateway
// =============================================================================

/// Gateway backed by a Supabase project.
#[derive(Clone)]
pub struct SupabaseGateway {
    inner: Arc<SupabaseGatewayInner>,
}

struct SupabaseGatewayInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    service_key: Option<SecretString>,
    events: AuthEvents,
}

impl SupabaseGateway {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("shopwave/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(SupabaseGatewayInner {
                client,
                base_url,
                anon_key: config.anon_key.clone(),
                service_key: config.service_key.clone(),
                events: AuthEvents::new(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| GatewayError::Api {
                status: 0,
                code: "invalid_url".to_owned(),
                message: e.to_string(),
            })
    }

    /// Build a request with the `apikey` header and a bearer token.
    fn request(
        &self,
        method: Method,
        path: &str,
        cred: Credential<'_>,
    ) -> Result<RequestBuilder, GatewayError> {
        let bearer = match cred {
            Credential::Anon => self.inner.anon_key.expose_secret(),
            Credential::User(token) => token.expose_secret(),
            Credential::Service => self
                .inner
                .service_key
                .as_ref()
                .ok_or_else(|| GatewayError::Forbidden("service key not configured".to_owned()))?
                .expose_secret(),
        };

        Ok(self
            .inner
            .client
            .request(method, self.endpoint(path)?)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer))
    }

    fn table_path(table: Table) -> String {
        format!("rest/v1/{}", table.as_str())
    }

    /// Send a request and return the body of a successful response.
    async fn send(request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        debug!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "gateway returned non-success status"
        );
        Err(map_error(status, &body))
    }

    async fn send_session(
        &self,
        request: RequestBuilder,
        kind: AuthEventKind,
    ) -> Result<AuthSession, GatewayError> {
        let body = Self::send(request).await?;
        let session: SessionResponse = serde_json::from_str(&body)?;
        let session = session.into_session();
        self.inner.events.emit(kind, &session.user.id);
        Ok(session)
    }
}

// =============================================================================
// Gateway Implementation
// =============================================================================

#[async_trait]
impl Gateway for SupabaseGateway {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<SignUp, GatewayError> {
        let request = self
            .request(Method::POST, "auth/v1/signup", Credential::Anon)?
            .json(&json!({ "email": email, "password": password.expose_secret() }));

        let body = Self::send(request).await?;
        let sign_up = match serde_json::from_str::<SignUpResponse>(&body)? {
            SignUpResponse::Session(session) => {
                let session = session.into_session();
                self.inner
                    .events
                    .emit(AuthEventKind::SignedIn, &session.user.id);
                SignUp {
                    identity: session.user.clone(),
                    session: Some(session),
                }
            }
            SignUpResponse::User(user) => SignUp {
                identity: user.into_identity(),
                session: None,
            },
        };
        Ok(sign_up)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        let request = self
            .request(Method::POST, "auth/v1/token", Credential::Anon)?
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password.expose_secret() }));

        self.send_session(request, AuthEventKind::SignedIn).await
    }

    #[instrument(skip_all)]
    async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        let request = self
            .request(Method::POST, "auth/v1/token", Credential::Anon)?
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }));

        self.send_session(request, AuthEventKind::TokenRefreshed)
            .await
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), GatewayError> {
        let user = self.current_user(access_token).await.ok().flatten();
        let request = self.request(Method::POST, "auth/v1/logout", Credential::User(access_token))?;
        Self::send(request).await?;

        if let Some(user) = user {
            self.inner.events.emit(AuthEventKind::SignedOut, &user.id);
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, GatewayError> {
        let request = self.request(Method::GET, "auth/v1/user", Credential::User(access_token))?;
        let body = Self::send(request).await?;
        let user: UserResponse = serde_json::from_str(&body)?;
        Ok(Some(user.into_identity()))
    }

    fn auth_events(&self) -> &AuthEvents {
        &self.inner.events
    }

    #[instrument(skip(self, cred), fields(table = %query.table))]
    async fn select(&self, cred: Credential<'_>, query: &Query) -> Result<Vec<Row>, GatewayError> {
        let request = self
            .request(Method::GET, &Self::table_path(query.table), cred)?
            .query(&query_params(query));

        let body = Self::send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self, cred), fields(table = %query.table))]
    async fn select_single(
        &self,
        cred: Credential<'_>,
        query: &Query,
    ) -> Result<Row, GatewayError> {
        let request = self
            .request(Method::GET, &Self::table_path(query.table), cred)?
            .query(&query_params(query))
            .header("Accept", SINGLE_OBJECT);

        let body = Self::send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self, cred, row))]
    async fn insert(
        &self,
        cred: Credential<'_>,
        table: Table,
        row: Row,
    ) -> Result<(), GatewayError> {
        let request = self
            .request(Method::POST, &Self::table_path(table), cred)?
            .header("Prefer", "return=minimal")
            .json(&row);

        Self::send(request).await.map(drop)
    }

    #[instrument(skip(self, cred, patch))]
    async fn update(
        &self,
        cred: Credential<'_>,
        table: Table,
        filters: &[Filter],
        patch: Row,
    ) -> Result<(), GatewayError> {
        let request = self
            .request(Method::PATCH, &Self::table_path(table), cred)?
            .query(&filter_params(filters))
            .header("Prefer", "return=minimal")
            .json(&patch);

        Self::send(request).await.map(drop)
    }

    #[instrument(skip(self, cred))]
    async fn delete(
        &self,
        cred: Credential<'_>,
        table: Table,
        filters: &[Filter],
    ) -> Result<(), GatewayError> {
        let request = self
            .request(Method::DELETE, &Self::table_path(table), cred)?
            .query(&filter_params(filters))
            .header("Prefer", "return=minimal");

        Self::send(request).await.map(drop)
    }

    #[instrument(skip(self, cred, row))]
    async fn upsert(
        &self,
        cred: Credential<'_>,
        table: Table,
        row: Row,
        on_conflict: &[&'static str],
    ) -> Result<(), GatewayError> {
        let request = self
            .request(Method::POST, &Self::table_path(table), cred)?
            .query(&[("on_conflict", on_conflict.join(","))])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);

        Self::send(request).await.map(drop)
    }

    async fn health(&self) -> Result<(), GatewayError> {
        let request = self.request(Method::GET, "auth/v1/health", Credential::Anon)?;
        Self::send(request).await.map(drop)
    }
}

// =============================================================================
// Query Encoding
// =============================================================================

/// Encode filters as `column=eq.value` pairs.
fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.to_owned(), format!("eq.{}", f.value)))
        .collect()
}

/// Encode a full query: `select`, filters, and `order`.
fn query_params(query: &Query) -> Vec<(String, String)> {
    let select = query.embed.map_or_else(
        || "*".to_owned(),
        |embed| format!("*,{}!{}(*)", embed.table.as_str(), embed.foreign_key),
    );

    let mut params = vec![("select".to_owned(), select)];
    params.extend(filter_params(&query.filters));
    if let Some(order) = query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_owned(), format!("{}.{direction}", order.column)));
    }
    params
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl UserResponse {
    fn into_identity(self) -> Identity {
        Identity {
            id: UserId::new(self.id),
            email: self.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    refresh_token: String,
    user: UserResponse,
}

impl SessionResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            user: self.user.into_identity(),
        }
    }
}

/// Signup returns a session when autoconfirm is on, a bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(SessionResponse),
    User(UserResponse),
}

/// Union of GoTrue and `PostgREST` error payloads.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    /// `PostgREST`/Postgres code (string) or GoTrue HTTP code (number).
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> String {
        self.error_code
            .clone()
            .or_else(|| match &self.code {
                Some(Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }

    fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

/// Map a non-success response to a [`GatewayError`].
fn map_error(status: StatusCode, body: &str) -> GatewayError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code();
    let message = parsed.message();

    match code.as_str() {
        PGRST_NO_ROWS => GatewayError::NotFound,
        PG_UNIQUE_VIOLATION => GatewayError::Conflict(message),
        PG_INSUFFICIENT_PRIVILEGE => GatewayError::Forbidden(message),
        PGRST_JWT_EXPIRED | "bad_jwt" | "session_not_found" | "session_expired"
        | "refresh_token_not_found" | "refresh_token_already_used" => GatewayError::TokenExpired,
        "invalid_credentials" | "invalid_grant" => {
            if message.to_lowercase().contains("refresh token") {
                GatewayError::TokenExpired
            } else {
                GatewayError::InvalidCredentials
            }
        }
        "user_already_exists" | "email_exists" => GatewayError::UserAlreadyExists,
        "weak_password" => GatewayError::WeakPassword(message),
        _ if status == StatusCode::UNAUTHORIZED => GatewayError::TokenExpired,
        _ if message.contains("already registered") => GatewayError::UserAlreadyExists,
        _ => GatewayError::Api {
            status: status.as_u16(),
            code,
            message,
        },
    }
}
