//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::gateway::{Gateway, GatewayError, SupabaseGateway};
use crate::middleware::session::SessionMemoryStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the gateway client, the session store, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    gateway: Arc<dyn Gateway>,
    sessions: SessionMemoryStore,
}

impl AppState {
    /// Create application state backed by the hosted gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, GatewayError> {
        let gateway = SupabaseGateway::new(&config.gateway)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// Create application state around an existing gateway.
    #[must_use]
    pub fn with_gateway(config: StorefrontConfig, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                sessions: SessionMemoryStore::default(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the gateway.
    #[must_use]
    pub fn gateway(&self) -> &dyn Gateway {
        self.inner.gateway.as_ref()
    }

    /// Get the session store backing the cookie sessions.
    #[must_use]
    pub fn sessions(&self) -> &SessionMemoryStore {
        &self.inner.sessions
    }
}
