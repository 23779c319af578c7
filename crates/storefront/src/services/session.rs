//! Session resolution and route guarding.
//!
//! Every request re-resolves the signed-in user from the stored gateway
//! tokens: identity first (refreshing an expired access token once), then the
//! role from `profiles` when a view needs it. Nothing is cached between
//! requests.

use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use shopwave_core::{Role, UserId};

use crate::gateway::{AuthEventKind, Credential, Gateway, GatewayError, Query, Table, to_row};
use crate::models::{GatewaySession, Profile};

// =============================================================================
// Types
// =============================================================================

/// Errors that stop role resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The gateway could not report the current identity.
    #[error("identity lookup failed: {0}")]
    Identity(#[source] GatewayError),

    /// Reading the profile failed for a reason other than "not found".
    #[error("profile lookup failed: {0}")]
    ProfileLookup(#[source] GatewayError),

    /// Creating the missing default profile failed.
    #[error("profile creation failed: {0}")]
    ProfileCreate(#[source] GatewayError),

    /// The profile row could not be decoded.
    #[error("malformed profile row: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A user whose access token the gateway accepted on this request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
    /// Resolved only when the caller asked for it.
    pub role: Option<Role>,
    /// Tokens to keep in the session; differ from the stored ones if `refreshed`.
    pub session: GatewaySession,
    /// The access token was refreshed while resolving.
    pub refreshed: bool,
    access_token: SecretString,
}

impl AuthenticatedUser {
    fn new(session: GatewaySession, refreshed: bool) -> Self {
        Self {
            id: session.user_id.clone(),
            email: session.email.clone(),
            role: None,
            access_token: session.access_token(),
            session,
            refreshed,
        }
    }

    /// Credential for row operations on behalf of this user.
    #[must_use]
    pub const fn credential(&self) -> Credential<'_> {
        Credential::User(&self.access_token)
    }

    /// Whether the resolved role is admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_some_and(Role::is_admin)
    }
}

/// Outcome of identity resolution.
#[derive(Debug)]
pub enum Resolution {
    Unauthenticated,
    Authenticated(AuthenticatedUser),
}

// =============================================================================
// SessionResolver
// =============================================================================

/// Resolves identity and role for the stored session.
pub struct SessionResolver<'a> {
    gateway: &'a dyn Gateway,
}

impl<'a> SessionResolver<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn Gateway) -> Self {
        Self { gateway }
    }

    /// Check the stored access token with the gateway.
    ///
    /// An expired token is refreshed once. If the refresh fails the user is
    /// signed out and `Unauthenticated` is returned.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Identity` if the gateway fails for any reason
    /// other than an expired token.
    #[instrument(skip_all, fields(user_id = %stored.user_id))]
    pub async fn authenticate(&self, stored: &GatewaySession) -> Result<Resolution, ResolveError> {
        match self.gateway.current_user(&stored.access_token()).await {
            Ok(Some(identity)) if identity.id == stored.user_id => Ok(Resolution::Authenticated(
                AuthenticatedUser::new(stored.clone(), false),
            )),
            Ok(_) => Ok(Resolution::Unauthenticated),
            Err(GatewayError::TokenExpired) => {
                match self.gateway.refresh_session(&stored.refresh_token()).await {
                    Ok(session) => {
                        tracing::debug!("access token refreshed");
                        Ok(Resolution::Authenticated(AuthenticatedUser::new(
                            GatewaySession::from_auth(&session),
                            true,
                        )))
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "session refresh failed, signing out");
                        self.gateway
                            .auth_events()
                            .emit(AuthEventKind::SignedOut, &stored.user_id);
                        Ok(Resolution::Unauthenticated)
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "identity lookup failed");
                Err(ResolveError::Identity(e))
            }
        }
    }

    /// Look up the user's role, creating the default profile if none exists.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::ProfileLookup` or `ResolveError::ProfileCreate`
    /// when the gateway fails; the error is logged before returning.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn role_for(&self, user: &AuthenticatedUser) -> Result<Role, ResolveError> {
        let query = Query::from(Table::Profiles).eq("id", user.id.as_str());

        match self.gateway.select_single(user.credential(), &query).await {
            Ok(row) => {
                let profile: Profile = serde_json::from_value(serde_json::Value::Object(row))?;
                Ok(profile.role)
            }
            Err(GatewayError::NotFound) => self.create_default_profile(user).await,
            Err(e) => {
                tracing::error!(error = %e, "error fetching user role");
                Err(ResolveError::ProfileLookup(e))
            }
        }
    }

    async fn create_default_profile(&self, user: &AuthenticatedUser) -> Result<Role, ResolveError> {
        let row = to_row(&Profile::new_user(user.id.clone())).map_err(ResolveError::ProfileCreate)?;

        match self
            .gateway
            .insert(user.credential(), Table::Profiles, row)
            .await
        {
            Ok(()) => {
                tracing::info!("created default profile");
                Ok(Role::User)
            }
            // Another request created it first.
            Err(GatewayError::Conflict(_)) => Ok(Role::User),
            Err(e) => {
                tracing::error!(error = %e, "error creating user profile");
                Err(ResolveError::ProfileCreate(e))
            }
        }
    }

    /// Identity plus role in one step.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::authenticate`] and [`Self::role_for`].
    pub async fn resolve(&self, stored: &GatewaySession) -> Result<Resolution, ResolveError> {
        match self.authenticate(stored).await? {
            Resolution::Authenticated(mut user) => {
                user.role = Some(self.role_for(&user).await?);
                Ok(Resolution::Authenticated(user))
            }
            Resolution::Unauthenticated => Ok(Resolution::Unauthenticated),
        }
    }
}

// =============================================================================
// RouteGuard
// =============================================================================

/// Role a protected view requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    /// Any signed-in user.
    None,
    /// Admins only.
    Admin,
}

/// What to do with a request to a protected view.
#[derive(Debug)]
pub enum GuardDecision {
    Allow(AuthenticatedUser),
    RedirectToLogin,
    /// Signed in without the required role.
    RedirectHome(AuthenticatedUser),
}

/// Identity first, role second.
pub struct RouteGuard<'a> {
    resolver: SessionResolver<'a>,
}

impl<'a> RouteGuard<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn Gateway) -> Self {
        Self {
            resolver: SessionResolver::new(gateway),
        }
    }

    /// Decide whether the stored session may see a view requiring `required`.
    pub async fn check(
        &self,
        required: RequiredRole,
        stored: Option<&GatewaySession>,
    ) -> GuardDecision {
        let Some(stored) = stored else {
            return GuardDecision::RedirectToLogin;
        };

        let mut user = match self.resolver.authenticate(stored).await {
            Ok(Resolution::Authenticated(user)) => user,
            Ok(Resolution::Unauthenticated) | Err(_) => return GuardDecision::RedirectToLogin,
        };

        if required == RequiredRole::None {
            return GuardDecision::Allow(user);
        }

        match self.resolver.role_for(&user).await {
            Ok(role) if role.is_admin() => {
                user.role = Some(role);
                GuardDecision::Allow(user)
            }
            Ok(_) | Err(_) => GuardDecision::RedirectHome(user),
        }
    }
}
