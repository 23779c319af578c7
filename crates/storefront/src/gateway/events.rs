//! Auth state change notifications.
//!
//! The gateway emits an [`AuthEvent`] whenever a session is established,
//! refreshed or ended. Subscribers hold an [`AuthSubscription`]; dropping it
//! releases the subscription.

use tokio::sync::broadcast;

use shopwave_core::UserId;

const CHANNEL_CAPACITY: usize = 64;

/// Kind of auth state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl AuthEventKind {
    /// Event name as sent to browsers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "signed-in",
            Self::SignedOut => "signed-out",
            Self::TokenRefreshed => "token-refreshed",
        }
    }
}

/// An auth state change for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub user_id: UserId,
}

/// Broadcast hub for auth events.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, kind: AuthEventKind, user_id: &UserId) {
        tracing::debug!(event = kind.as_str(), user_id = %user_id, "auth event");
        let _ = self.sender.send(AuthEvent {
            kind,
            user_id: user_id.clone(),
        });
    }

    /// Start listening for events.
    #[must_use]
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live subscription to auth events.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Wait for the next event. Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        tracing::debug!("auth event subscription released");
    }
}
