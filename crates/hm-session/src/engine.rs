use chrono::{DateTime, Utc};
use hm_core::{ChronicleFeedEntry, GuildShipsResponse};
use serde::Serialize;
use tracing::debug;

use crate::error::SessionError;
use crate::reconcile::{FeedOutcome, Reconciler, ReconciliationJob};
use crate::session::{Session, SessionId};
use crate::store::{SessionDiff, SessionStore};

/// Everything one poll cycle produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleResult {
    pub diff: SessionDiff,
    /// Ships whose chronicle feed should be fetched now.
    pub due_ships: Vec<String>,
}

/// Synchronous session core: the store plus its pending reconciliation jobs.
///
/// All state changes happen through `&mut self`, so a single owner (or one
/// mutex) serialises diffing and feed application.
#[derive(Debug, Default)]
pub struct SessionEngine {
    store: SessionStore,
    reconciler: Reconciler,
}

impl SessionEngine {
    pub fn new(max_attempts: i32) -> Self {
        Self {
            store: SessionStore::new(),
            reconciler: Reconciler::new(max_attempts),
        }
    }

    pub fn is_started(&self) -> bool {
        self.store.is_started()
    }

    pub fn start(
        &mut self,
        snapshot: &GuildShipsResponse,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionId>, SessionError> {
        self.store.start(snapshot, now)
    }

    /// Diff the snapshot, count pending jobs down, then queue a job for every
    /// session that just ended.
    ///
    /// Jobs created here are not due before the next cycle.
    pub fn update(
        &mut self,
        snapshot: &GuildShipsResponse,
        now: DateTime<Utc>,
    ) -> Result<CycleResult, SessionError> {
        let diff = self.store.update(snapshot, now)?;
        let due_ships = self.reconciler.tick();

        for id in &diff.removals {
            if let Some(session) = self.store.get(*id) {
                self.reconciler.enqueue(session);
            }
        }
        if !due_ships.is_empty() {
            debug!(ships = ?due_ships, "chronicle fetches due");
        }
        Ok(CycleResult { diff, due_ships })
    }

    /// Apply a fetched feed; `now` is the apply time, not the fetch time.
    pub fn apply_feed(
        &mut self,
        ship_id: &str,
        feed: &[ChronicleFeedEntry],
        now: DateTime<Utc>,
    ) -> FeedOutcome {
        self.reconciler.apply_feed(ship_id, feed, &mut self.store, now)
    }

    /// Return a claimed ship after its fetch failed; its jobs stay pending.
    pub fn release(&mut self, ship_id: &str) {
        self.reconciler.release(ship_id);
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.store.get(id)
    }

    pub fn sessions(&self) -> &[Session] {
        self.store.sessions()
    }

    pub fn pending_jobs(&self) -> &[ReconciliationJob] {
        self.reconciler.jobs()
    }

    /// Drop an ended session once nothing is waiting on it.
    ///
    /// Returns `None` for active sessions and for sessions that still have a
    /// reconciliation job.
    pub fn forget(&mut self, id: SessionId) -> Option<Session> {
        if self.reconciler.has_job(id) {
            return None;
        }
        self.store.remove(id)
    }
}
