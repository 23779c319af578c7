//! Authentication route handlers.
//!
//! Handles login, registration, and sign-out. Credentials are checked by the
//! gateway; the resulting tokens are kept in the cookie session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::MessageQuery;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalUser, clear_gateway_session, get_gateway_session, set_gateway_session};
use crate::services::AuthService;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login and registration form data.
#[derive(Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

impl CredentialsForm {
    fn password(&self) -> SecretString {
        SecretString::from(self.password.clone())
    }
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login or register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    /// Login form when true, registration form otherwise.
    pub is_login: bool,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

impl AuthTemplate {
    fn new(is_login: bool, query: &MessageQuery) -> Self {
        Self {
            is_login,
            error: query.error_text(),
            success: query.success_text(),
        }
    }

    /// Page heading and submit label.
    #[must_use]
    pub const fn heading(&self) -> &'static str {
        if self.is_login { "Login" } else { "Register" }
    }

    #[must_use]
    pub const fn action(&self) -> &'static str {
        if self.is_login { "/login" } else { "/register" }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in users go straight to the dashboard.
pub async fn login_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    AuthTemplate::new(true, &query).into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let auth = AuthService::new(state.gateway());

    let gateway_session = match auth.login(&form.email, &form.password()).await {
        Ok(gateway_session) => gateway_session,
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            return Redirect::to(&format!("/login?error={}", e.code())).into_response();
        }
    };

    // New identity, new session id
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "failed to cycle session id");
        return Redirect::to("/login?error=session").into_response();
    }
    if let Err(e) = set_gateway_session(&session, &gateway_session).await {
        tracing::error!(error = %e, "failed to set session");
        return Redirect::to("/login?error=session").into_response();
    }

    set_sentry_user(&gateway_session.user_id, Some(&gateway_session.email));
    tracing::info!(user_id = %gateway_session.user_id, "signed in");
    Redirect::to("/").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    AuthTemplate::new(false, &query).into_response()
}

/// Handle registration form submission.
///
/// The user is not signed in afterwards; they confirm their email and log in.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn register(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> Response {
    match AuthService::new(state.gateway())
        .register(&form.email, &form.password())
        .await
    {
        Ok(_) => Redirect::to("/login?success=registered").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "registration failed");
            Redirect::to(&format!("/register?error={}", e.code())).into_response()
        }
    }
}

// =============================================================================
// Sign-out Route
// =============================================================================

/// Handle sign-out.
///
/// Revokes the gateway session (best effort) and destroys the cookie session.
#[instrument(skip_all)]
pub async fn signout(State(state): State<AppState>, session: Session) -> Response {
    if let Some(stored) = get_gateway_session(&session).await {
        AuthService::new(state.gateway()).logout(&stored).await;
    }

    if let Err(e) = clear_gateway_session(&session).await {
        tracing::error!(error = %e, "failed to clear session");
    }
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "failed to flush session");
    }

    clear_sentry_user();
    Redirect::to("/login?success=signed_out").into_response()
}
