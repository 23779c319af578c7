//! Authentication middleware and extractors.
//!
//! Provides extractors that run the route guard against the gateway session
//! stored in the cookie session. Every extraction re-validates the tokens
//! with the gateway; refreshed tokens are written back to the session and a
//! rejected session is cleared.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{GatewaySession, session_keys};
use crate::services::{
    AuthenticatedUser, GuardDecision, RequiredRole, Resolution, RouteGuard, SessionResolver,
};
use crate::state::AppState;

/// Extractor that requires a signed-in user of any role.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub AuthenticatedUser);

/// Extractor that requires a signed-in admin.
///
/// Signed-in non-admins are sent back to the dashboard.
pub struct RequireAdmin(pub AuthenticatedUser);

/// Extractor that optionally resolves the signed-in user.
///
/// Unlike `RequireUser`, this never rejects. Role is not resolved.
pub struct OptionalUser(pub Option<AuthenticatedUser>);

/// Error returned when a guarded route is not allowed.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Redirect to the dashboard (signed in, wrong role).
    RedirectHome,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Forbidden response (for API requests by non-admins).
    Forbidden,
}

impl AuthRejection {
    fn for_path(wrong_role: bool, path: &str) -> Self {
        let is_api = path.starts_with("/api/");
        match (wrong_role, is_api) {
            (true, true) => Self::Forbidden,
            (true, false) => Self::RedirectHome,
            (false, true) => Self::Unauthorized,
            (false, false) => Self::RedirectToLogin,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::RedirectHome => Redirect::to("/?error=forbidden").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

async fn guard(
    parts: &Parts,
    state: &AppState,
    required: RequiredRole,
) -> Result<AuthenticatedUser, AuthRejection> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Err(AuthRejection::Unauthorized);
    };
    let stored = get_gateway_session(session).await;

    let decision = RouteGuard::new(state.gateway())
        .check(required, stored.as_ref())
        .await;

    match decision {
        GuardDecision::Allow(user) => {
            persist_refresh(session, &user).await;
            Ok(user)
        }
        GuardDecision::RedirectHome(user) => {
            // The refresh token was spent even though access is denied.
            persist_refresh(session, &user).await;
            Err(AuthRejection::for_path(true, parts.uri.path()))
        }
        GuardDecision::RedirectToLogin => {
            if stored.is_some() {
                discard_gateway_session(session).await;
            }
            Err(AuthRejection::for_path(false, parts.uri.path()))
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        guard(parts, state, RequiredRole::None).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        guard(parts, state, RequiredRole::Admin).await.map(Self)
    }
}

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };
        let Some(stored) = get_gateway_session(session).await else {
            return Ok(Self(None));
        };

        let user = match SessionResolver::new(state.gateway())
            .authenticate(&stored)
            .await
        {
            Ok(Resolution::Authenticated(user)) => {
                persist_refresh(session, &user).await;
                Some(user)
            }
            Ok(Resolution::Unauthenticated) => {
                discard_gateway_session(session).await;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not resolve session");
                None
            }
        };

        Ok(Self(user))
    }
}

/// Write refreshed tokens back to the session. Failures are logged.
pub async fn persist_refresh(session: &Session, user: &AuthenticatedUser) {
    if user.refreshed
        && let Err(e) = set_gateway_session(session, &user.session).await
    {
        tracing::warn!(error = %e, "failed to store refreshed tokens");
    }
}

/// Drop tokens the gateway no longer accepts. Failures are logged.
async fn discard_gateway_session(session: &Session) {
    if let Err(e) = clear_gateway_session(session).await {
        tracing::error!(error = %e, "failed to clear session");
    }
}

/// Read the stored gateway session, treating unreadable data as absent.
pub async fn get_gateway_session(session: &Session) -> Option<GatewaySession> {
    session
        .get::<GatewaySession>(session_keys::GATEWAY_SESSION)
        .await
        .ok()
        .flatten()
}

/// Helper to store the gateway session after sign-in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_gateway_session(
    session: &Session,
    gateway_session: &GatewaySession,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::GATEWAY_SESSION, gateway_session)
        .await
}

/// Helper to clear the gateway session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_gateway_session(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<GatewaySession>(session_keys::GATEWAY_SESSION)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use shopwave_core::UserId;
    use tower_sessions::session::{Id, Record};
    use tower_sessions::session_store::{self, SessionStore};

    use super::*;
    use crate::gateway::{AuthSession, Identity};
    use crate::middleware::SessionMemoryStore;

    #[derive(Debug, Clone)]
    struct UnreachableStore;

    #[async_trait]
    impl SessionStore for UnreachableStore {
        async fn save(&self, _record: &Record) -> session_store::Result<()> {
            Err(session_store::Error::Backend("store offline".to_owned()))
        }

        async fn load(&self, _id: &Id) -> session_store::Result<Option<Record>> {
            Err(session_store::Error::Backend("store offline".to_owned()))
        }

        async fn delete(&self, _id: &Id) -> session_store::Result<()> {
            Err(session_store::Error::Backend("store offline".to_owned()))
        }
    }

    fn stored_tokens() -> GatewaySession {
        GatewaySession::from_auth(&AuthSession {
            access_token: SecretString::from("access-1"),
            refresh_token: SecretString::from("refresh-1"),
            user: Identity {
                id: UserId::new("user-1"),
                email: "ada@example.com".to_owned(),
            },
        })
    }

    #[tokio::test]
    async fn test_discard_removes_stored_tokens() {
        let session = Session::new(None, Arc::new(SessionMemoryStore::default()), None);
        set_gateway_session(&session, &stored_tokens()).await.unwrap();
        assert!(get_gateway_session(&session).await.is_some());

        discard_gateway_session(&session).await;
        assert!(get_gateway_session(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_discard_survives_store_failure() {
        let session = Session::new(Some(Id::default()), Arc::new(UnreachableStore), None);
        assert!(clear_gateway_session(&session).await.is_err());

        // Logged, not propagated.
        discard_gateway_session(&session).await;
        assert!(get_gateway_session(&session).await.is_none());
    }

    #[test]
    fn test_rejection_for_html_and_api_paths() {
        assert!(matches!(
            AuthRejection::for_path(false, "/cart"),
            AuthRejection::RedirectToLogin
        ));
        assert!(matches!(
            AuthRejection::for_path(false, "/api/auth/events"),
            AuthRejection::Unauthorized
        ));
        assert!(matches!(
            AuthRejection::for_path(true, "/admin/items"),
            AuthRejection::RedirectHome
        ));
        assert!(matches!(
            AuthRejection::for_path(true, "/api/admin"),
            AuthRejection::Forbidden
        ));
    }

    #[test]
    fn test_rejection_responses() {
        let response = AuthRejection::RedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");

        let response = AuthRejection::RedirectHome.into_response();
        assert_eq!(response.headers()["location"], "/?error=forbidden");

        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
