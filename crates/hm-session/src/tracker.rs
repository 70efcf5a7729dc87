//! Async service tying the session engine to the scheduled roster API.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hm_scheduler::{Admission, ChronicleScope, RosterApi};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::engine::SessionEngine;
use crate::error::{ReconcileError, SessionError};
use crate::listeners::{ChronicleListener, ListenerRegistry, Subscription};
use crate::reconcile::{DEFAULT_MAX_ATTEMPTS, FeedOutcome, ReconciliationJob};
use crate::session::{Session, SessionId};
use crate::store::SessionDiff;

/// Which chronicle feed reconciliation reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedScope {
    /// The ship's own feed; ships without an id fall back to the guild feed.
    #[default]
    Ship,
    Guild,
}

#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub guild_id: String,
    pub max_attempts: i32,
    pub scope: FeedScope,
}

impl TrackerOptions {
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scope: FeedScope::default(),
        }
    }
}

/// Result of one ship's reconciliation round.
///
/// Job bookkeeping is complete whenever a round yields this value; listener
/// failures are reported alongside the outcome rather than replacing it.
#[derive(Debug)]
pub struct ShipReconciliation {
    pub ship_id: String,
    pub outcome: FeedOutcome,
    /// One `ReconcileError::Listener` per matched session a listener rejected.
    pub listener_errors: Vec<ReconcileError>,
}

impl ShipReconciliation {
    /// Sessions whose jobs this round closed, matched first.
    pub fn resolved(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.outcome
            .matched
            .iter()
            .chain(&self.outcome.abandoned)
            .copied()
    }
}

/// Reconciliation rounds started by one `update`.
///
/// Rounds keep running when this is dropped; awaiting [`next`](Self::next) is
/// only needed to observe their results.
pub struct Reconciliations {
    tasks: JoinSet<Result<ShipReconciliation, ReconcileError>>,
}

impl Reconciliations {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Next finished round, in completion order. `None` once all are drained.
    pub async fn next(&mut self) -> Option<Result<ShipReconciliation, ReconcileError>> {
        let joined = self.tasks.join_next().await?;
        Some(match joined {
            Ok(result) => result,
            Err(err) => Err(ReconcileError::Task(err.to_string())),
        })
    }
}

impl Drop for Reconciliations {
    fn drop(&mut self) {
        self.tasks.detach_all();
    }
}

impl std::fmt::Debug for Reconciliations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciliations")
            .field("pending", &self.tasks.len())
            .finish()
    }
}

/// Session tracking for one guild.
///
/// Cloning is cheap and every clone drives the same sessions.
#[derive(Clone)]
pub struct SessionTracker {
    api: Arc<dyn RosterApi>,
    clock: Arc<dyn Clock>,
    engine: Arc<Mutex<SessionEngine>>,
    listeners: Arc<ListenerRegistry>,
    options: Arc<TrackerOptions>,
}

impl SessionTracker {
    pub fn new(api: Arc<dyn RosterApi>, clock: Arc<dyn Clock>, options: TrackerOptions) -> Self {
        Self {
            api,
            clock,
            engine: Arc::new(Mutex::new(SessionEngine::new(options.max_attempts))),
            listeners: Arc::new(ListenerRegistry::new()),
            options: Arc::new(options),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn ChronicleListener>) -> Subscription {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    /// Fetch the roster with priority and open a session per ship at sea.
    pub async fn start(&self) -> Result<Vec<Session>, SessionError> {
        if self.engine().is_started() {
            return Err(SessionError::AlreadyStarted);
        }
        let snapshot = self
            .api
            .guild_ships(Admission::Priority, &self.options.guild_id)
            .await?;

        let mut engine = self.engine();
        let ids = engine.start(&snapshot, self.clock.now())?;
        info!(guild = %self.options.guild_id, sessions = ids.len(), "session tracking started");
        Ok(ids
            .into_iter()
            .filter_map(|id| engine.session(id).cloned())
            .collect())
    }

    /// Fetch the roster with priority, apply the diff, and launch the
    /// chronicle fetches that became due.
    ///
    /// The diff is fully applied before any fetch is issued. A failed fetch
    /// only affects its own ship's round.
    pub async fn update(&self) -> Result<(SessionDiff, Reconciliations), SessionError> {
        if !self.engine().is_started() {
            return Err(SessionError::NotStarted);
        }
        let snapshot = self
            .api
            .guild_ships(Admission::Priority, &self.options.guild_id)
            .await?;
        let cycle = self.engine().update(&snapshot, self.clock.now())?;

        let mut tasks = JoinSet::new();
        for ship_id in cycle.due_ships {
            let tracker = self.clone();
            tasks.spawn(async move { tracker.reconcile_ship(ship_id).await });
        }
        debug!(
            additions = cycle.diff.additions.len(),
            removals = cycle.diff.removals.len(),
            fetches = tasks.len(),
            "session update applied"
        );
        Ok((cycle.diff, Reconciliations { tasks }))
    }

    async fn reconcile_ship(&self, ship_id: String) -> Result<ShipReconciliation, ReconcileError> {
        let scope = match self.options.scope {
            FeedScope::Ship => ChronicleScope::for_ship(&ship_id),
            FeedScope::Guild => ChronicleScope::Guild,
        };
        let feed = match self
            .api
            .chronicle_feed(Admission::Normal, &self.options.guild_id, scope)
            .await
        {
            Ok(feed) => feed,
            Err(source) => {
                self.engine().release(&ship_id);
                return Err(ReconcileError::Fetch { ship_id, source });
            }
        };
        let Some(entries) = feed.feed else {
            self.engine().release(&ship_id);
            return Err(ReconcileError::InvalidFeed { ship_id });
        };

        let (outcome, matched) = {
            let mut engine = self.engine();
            let outcome = engine.apply_feed(&ship_id, &entries, self.clock.now());
            let matched: Vec<Session> = outcome
                .matched
                .iter()
                .filter_map(|id| engine.session(*id).cloned())
                .collect();
            (outcome, matched)
        };

        let mut listener_errors = Vec::new();
        for session in &matched {
            if let Err(err) = self.listeners.notify(session).await {
                debug!(
                    session = %session.id(),
                    ship_id = %ship_id,
                    error = %err,
                    "listener rejected matched session"
                );
                listener_errors.push(err);
            }
        }
        Ok(ShipReconciliation {
            ship_id,
            outcome,
            listener_errors,
        })
    }

    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.engine().session(id).cloned()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.engine().sessions().to_vec()
    }

    pub fn pending_jobs(&self) -> Vec<ReconciliationJob> {
        self.engine().pending_jobs().to_vec()
    }

    /// Drop an ended session with no pending job. See [`SessionEngine::forget`].
    pub fn forget(&self, id: SessionId) -> Option<Session> {
        self.engine().forget(id)
    }

    fn engine(&self) -> MutexGuard<'_, SessionEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("options", &self.options)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
