//! Session-related types.
//!
//! Types stored in the session for authentication state.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use shopwave_core::UserId;

use crate::gateway::AuthSession;

/// Gateway session tokens stored in the server-side session.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewaySession {
    /// Gateway auth user id.
    pub user_id: UserId,
    /// Email the user signed in with.
    pub email: String,
    access_token: String,
    refresh_token: String,
}

impl GatewaySession {
    /// Wrap freshly issued tokens.
    #[must_use]
    pub fn from_auth(session: &AuthSession) -> Self {
        use secrecy::ExposeSecret;

        Self {
            user_id: session.user.id.clone(),
            email: session.user.email.clone(),
            access_token: session.access_token.expose_secret().to_owned(),
            refresh_token: session.refresh_token.expose_secret().to_owned(),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> SecretString {
        SecretString::from(self.refresh_token.clone())
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the signed-in user's gateway session.
    pub const GATEWAY_SESSION: &str = "gateway_session";
}
