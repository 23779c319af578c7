//! Session middleware configuration.
//!
//! The cookie session holds only the gateway tokens. Identity and role are
//! re-resolved from the gateway on every request, so an in-memory store is
//! enough; a restart simply signs everyone out.
//!
//! Records that outlive their inactivity expiry are dropped by
//! [`purge_expired_sessions`], which the binary runs on an interval.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shopwave_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// How often the binary sweeps expired records.
pub const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// In-memory session store that can drop expired records.
#[derive(Clone, Debug, Default)]
pub struct SessionMemoryStore(Arc<Mutex<HashMap<Id, Record>>>);

impl SessionMemoryStore {
    /// Remove every record past its expiry and return how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut records = self.0.lock().await;
        let before = records.len();
        records.retain(|_, record| record.expiry_date > now);
        before - records.len()
    }

    /// Number of records currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for SessionMemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.0.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.0.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .0
            .lock()
            .await
            .get(session_id)
            .filter(|record| record.expiry_date > now)
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.0.lock().await.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SessionMemoryStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        self.purge_expired().await;
        Ok(())
    }
}

/// Sweep expired sessions forever, once per `period`.
pub async fn purge_expired_sessions(store: SessionMemoryStore, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        let purged = store.purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "dropped expired sessions");
        }
    }
}

/// Create the session layer over the shared store.
#[must_use]
pub fn create_session_layer(
    config: &StorefrontConfig,
    store: SessionMemoryStore,
) -> SessionManagerLayer<SessionMemoryStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_sessions::cookie::time::Duration as TimeDuration;

    use super::*;

    fn record(expires_in: TimeDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::default(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired_records() {
        let store = SessionMemoryStore::default();
        let live = record(TimeDuration::hours(1));
        let stale = record(TimeDuration::seconds(-1));
        store.save(&live).await.unwrap();
        store.save(&stale).await.unwrap();
        assert_eq!(store.len().await, 2);

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.load(&live.id).await.unwrap().is_some());
        assert!(store.load(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_is_not_loaded_before_purge() {
        let store = SessionMemoryStore::default();
        let stale = record(TimeDuration::seconds(-1));
        store.save(&stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
        store.delete_expired().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_avoids_id_collisions() {
        let store = SessionMemoryStore::default();
        let first = record(TimeDuration::hours(1));
        store.save(&first).await.unwrap();

        let mut second = record(TimeDuration::hours(1));
        second.id = first.id;
        store.create(&mut second).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_purge_task_sweeps_on_interval() {
        let store = SessionMemoryStore::default();
        store.save(&record(TimeDuration::seconds(-1))).await.unwrap();

        let task = tokio::spawn(purge_expired_sessions(
            store.clone(),
            Duration::from_millis(10),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_empty().await);
        task.abort();
    }
}
