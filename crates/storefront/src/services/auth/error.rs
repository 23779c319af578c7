//! Authentication error types.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shopwave_core::EmailError),

    /// Wrong email/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password rejected by the gateway's policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Any other gateway failure.
    #[error("gateway error: {0}")]
    Gateway(GatewayError),
}

impl From<GatewayError> for AuthError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidCredentials => Self::InvalidCredentials,
            GatewayError::UserAlreadyExists => Self::UserAlreadyExists,
            GatewayError::WeakPassword(msg) => Self::WeakPassword(msg),
            other => Self::Gateway(other),
        }
    }
}

impl AuthError {
    /// Short code for `?error=` redirects back to the form.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid_email",
            Self::InvalidCredentials => "credentials",
            Self::UserAlreadyExists => "exists",
            Self::WeakPassword(_) => "weak_password",
            Self::Gateway(GatewayError::RateLimited(_)) => "rate_limited",
            Self::Gateway(_) => "unavailable",
        }
    }
}
