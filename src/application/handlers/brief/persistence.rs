//! Best-effort write-through and completion registration.
//!
//! Neither operation can fail a turn: store failures are logged and the
//! already-computed response is sent anyway, and registration runs as a
//! detached task that reports only through the log.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::domain::session::Session;
use crate::ports::{CampaignRegistration, CampaignRegistry, SessionStore};

pub struct PersistenceBridge {
    store: Arc<dyn SessionStore>,
    registry: Option<Arc<dyn CampaignRegistry>>,
}

impl PersistenceBridge {
    /// Creates a bridge. Without a registry, completion registration is
    /// skipped.
    pub fn new(store: Arc<dyn SessionStore>, registry: Option<Arc<dyn CampaignRegistry>>) -> Self {
        Self { store, registry }
    }

    /// Writes the session back to the store. Failures are logged only.
    pub async fn persist(&self, session: &Session) {
        match self.store.update(session).await {
            Ok(()) => tracing::debug!(turns = session.turns().len(), "Session persisted"),
            Err(err) => tracing::warn!(error = %err, "Failed to persist session"),
        }
    }

    /// Spawns the downstream registration of the session's brief.
    ///
    /// The completion flag is stripped from the payload. Returns the task
    /// handle so callers may await it; dropping it leaves the task running.
    pub fn dispatch_registration(&self, session: &Session) -> Option<JoinHandle<()>> {
        let Some(registry) = &self.registry else {
            tracing::info!("Campaign registration is not configured, skipping");
            return None;
        };

        let registration = CampaignRegistration {
            data: session.data().without_completion_flag(),
            campaign_id: session.campaign_id().map(str::to_string),
        };
        let registry = Arc::clone(registry);

        let task = async move {
            match registry.register(registration).await {
                Ok(()) => tracing::info!("Campaign registered"),
                Err(err) => tracing::error!(error = %err, "Campaign registration failed"),
            }
        };

        Some(tokio::spawn(task.in_current_span()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemorySessionStore;
    use crate::domain::foundation::SessionId;
    use crate::ports::{RegistrationError, SessionStoreError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn find_by_id(&self, _id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
            Ok(None)
        }

        async fn create(&self, _session: &Session) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::DatabaseError("down".into()))
        }

        async fn update(&self, _session: &Session) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::DatabaseError("down".into()))
        }
    }

    #[derive(Default)]
    struct RecordingRegistry {
        received: Mutex<Vec<CampaignRegistration>>,
        fail: bool,
    }

    #[async_trait]
    impl CampaignRegistry for RecordingRegistry {
        async fn register(&self, registration: CampaignRegistration) -> Result<(), RegistrationError> {
            self.received.lock().unwrap().push(registration);
            if self.fail {
                Err(RegistrationError::Network("refused".into()))
            } else {
                Ok(())
            }
        }
    }

    fn completed_session() -> Session {
        let mut session = Session::new(SessionId::new("s1").unwrap());
        session.assign_campaign(Some("c-1"));
        session.merge_extraction(
            json!({ "Description": "lanzamiento", "datos_completos": true })
                .as_object()
                .unwrap(),
        );
        session
    }

    #[tokio::test]
    async fn persist_writes_through_to_store() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = completed_session();
        store.create(&Session::new(session.id().clone())).await.unwrap();
        let bridge = PersistenceBridge::new(store.clone(), None);

        bridge.persist(&session).await;

        let stored = store.find_by_id(session.id()).await.unwrap().unwrap();
        assert_eq!(stored.data(), session.data());
    }

    #[tokio::test]
    async fn persist_swallows_store_failure() {
        let bridge = PersistenceBridge::new(Arc::new(FailingStore), None);
        bridge.persist(&completed_session()).await;
    }

    #[tokio::test]
    async fn registration_strips_completion_flag() {
        let registry = Arc::new(RecordingRegistry::default());
        let bridge = PersistenceBridge::new(Arc::new(FailingStore), Some(registry.clone()));

        let handle = bridge.dispatch_registration(&completed_session()).unwrap();
        handle.await.unwrap();

        let received = registry.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].data.get("datos_completos"), None);
        assert_eq!(received[0].data["Description"], "lanzamiento");
        assert_eq!(received[0].campaign_id.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn registration_failure_does_not_panic_the_task() {
        let registry = Arc::new(RecordingRegistry {
            fail: true,
            ..Default::default()
        });
        let bridge = PersistenceBridge::new(Arc::new(FailingStore), Some(registry));

        let handle = bridge.dispatch_registration(&completed_session()).unwrap();

        assert!(handle.await.is_ok());
    }

    #[test]
    fn registration_is_skipped_without_registry() {
        let bridge = PersistenceBridge::new(Arc::new(FailingStore), None);
        assert!(bridge.dispatch_registration(&completed_session()).is_none());
    }
}
