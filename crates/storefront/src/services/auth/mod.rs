//! Authentication service.
//!
//! Password sign-up and sign-in are delegated to the gateway; this service
//! validates input and creates the default profile after signup.

mod error;

pub use error::AuthError;

use secrecy::SecretString;
use tracing::instrument;

use shopwave_core::Email;

use crate::gateway::{Credential, Gateway, GatewayError, Table, to_row};
use crate::models::{GatewaySession, Profile};

/// Authentication service.
pub struct AuthService<'a> {
    gateway: &'a dyn Gateway,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(gateway: &'a dyn Gateway) -> Self {
        Self { gateway }
    }

    /// Register a new account and its default profile.
    ///
    /// Signup and profile creation are separate writes. If the profile insert
    /// fails the account still exists; the session resolver creates the
    /// missing profile on first sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the gateway rejects the password.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &SecretString) -> Result<Email, AuthError> {
        let email = Email::parse(email)?;
        let sign_up = self.gateway.sign_up(email.as_str(), password).await?;

        let credential = sign_up
            .session
            .as_ref()
            .map_or(Credential::Anon, |session| {
                Credential::User(&session.access_token)
            });
        let profile = to_row(&Profile::new_user(sign_up.identity.id.clone()))
            .map_err(AuthError::Gateway)?;

        match self.gateway.insert(credential, Table::Profiles, profile).await {
            Ok(()) | Err(GatewayError::Conflict(_)) => {}
            Err(e) => {
                tracing::warn!(
                    user_id = %sign_up.identity.id,
                    error = %e,
                    "profile creation after signup failed; will be created on first sign-in"
                );
            }
        }

        tracing::info!(user_id = %sign_up.identity.id, "account registered");
        Ok(email)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<GatewaySession, AuthError> {
        let email = Email::parse(email)?;
        let session = self.gateway.sign_in(email.as_str(), password).await?;
        Ok(GatewaySession::from_auth(&session))
    }

    /// Revoke the gateway session. Failures are logged, never returned.
    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn logout(&self, session: &GatewaySession) {
        if let Err(e) = self.gateway.sign_out(&session.access_token()).await {
            tracing::debug!(error = %e, "gateway sign-out failed");
            self.gateway
                .auth_events()
                .emit(crate::gateway::AuthEventKind::SignedOut, &session.user_id);
        }
    }
}
