//! Chronicle-updated notification.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::ReconcileError;
use crate::session::Session;

/// Receives a session right after a chronicle entry was assigned to it.
#[async_trait]
pub trait ChronicleListener: Send + Sync {
    async fn on_chronicle_updated(&self, session: &Session) -> anyhow::Result<()>;
}

/// Handle returned by [`ListenerRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Arc<dyn ChronicleListener>>,
}

/// Listeners keyed by subscription, dispatched in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<Listeners>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn ChronicleListener>) -> Subscription {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(id, listener);
        Subscription(id)
    }

    /// Returns `false` if the subscription was already revoked.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .remove(&subscription.0)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Await every listener in order; the first failure stops dispatch.
    ///
    /// Listeners registered while a dispatch is running are not called for it.
    pub async fn notify(&self, session: &Session) -> Result<(), ReconcileError> {
        let listeners: Vec<Arc<dyn ChronicleListener>> = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener
                .on_chronicle_updated(session)
                .await
                .map_err(|source| ReconcileError::Listener {
                    session_id: session.id(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at_sea, t};
    use hm_core::ShipType;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl ChronicleListener for Recorder {
        async fn on_chronicle_updated(&self, _session: &Session) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                anyhow::bail!("{} refused", self.name);
            }
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn ChronicleListener> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    fn session() -> Session {
        Session::create(&at_sea("s1", ShipType::Sloop, vec![]), None, t(0))
    }

    #[tokio::test]
    async fn test_listeners_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.subscribe(recorder("first", &log, false));
        registry.subscribe(recorder("second", &log, false));
        registry.subscribe(recorder("third", &log, false));

        registry.notify(&session()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_that_listener() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let first = registry.subscribe(recorder("first", &log, false));
        registry.subscribe(recorder("second", &log, false));

        assert!(registry.unsubscribe(first));
        assert!(!registry.unsubscribe(first));
        assert_eq!(registry.len(), 1);

        registry.notify(&session()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_failure_propagates_and_stops_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.subscribe(recorder("first", &log, true));
        registry.subscribe(recorder("second", &log, false));
        let session = session();

        let err = registry.notify(&session).await.unwrap_err();
        match err {
            ReconcileError::Listener { session_id, source } => {
                assert_eq!(session_id, session.id());
                assert_eq!(source.to_string(), "first refused");
            }
            other => panic!("expected Listener error, got {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_empty_registry_is_ok() {
        let registry = ListenerRegistry::new();
        assert!(registry.is_empty());
        registry.notify(&session()).await.unwrap();
    }
}
