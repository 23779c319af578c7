//! Unified error handling with Sentry integration.
//!
//! Most failures are shown as a notice on the next page. `AppError` covers the
//! ones that leave nothing to render: the session cannot be resolved, or the
//! session store fails. It captures them to Sentry before responding.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::filters;
use crate::services::ResolveError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identity or role could not be resolved.
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Page shown when a request fails outright.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub message: &'static str,
    pub retry_url: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        // Don't expose internal error details to clients
        let (status, message) = match self {
            Self::Resolve(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "We could not load your account right now.",
            ),
            Self::Session(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Your session could not be saved.",
            ),
        };

        (
            status,
            ErrorTemplate {
                message,
                retry_url: "/",
            },
        )
            .into_response()
    }
}

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("item_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_owned(),
                serde_json::Value::String((*value).to_owned()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::gateway::GatewayError;

    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_failure_renders_retry_page() {
        let err = AppError::from(ResolveError::ProfileLookup(GatewayError::Api {
            status: 500,
            code: "XX000".to_owned(),
            message: "connection reset by peer".to_owned(),
        }));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_text(response).await;
        assert!(body.contains("Try again"));
        assert!(!body.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_session_failure_is_internal() {
        let json = serde_json::from_str::<u8>("not json").unwrap_err();
        let err = AppError::from(tower_sessions::session::Error::from(json));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("could not be saved"));
    }
}
