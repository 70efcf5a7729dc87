//! Session store and roster diffing.

use chrono::{DateTime, Utc};
use hm_core::{GuildShip, GuildShipsResponse};
use serde::Serialize;
use tracing::debug;

use crate::error::SessionError;
use crate::session::{SeenOutcome, Session, SessionId};

/// Three-way result of one roster poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionDiff {
    /// Sessions started by this poll.
    pub additions: Vec<SessionId>,
    /// Sessions ended by this poll.
    pub removals: Vec<SessionId>,
    /// Sessions that continue.
    pub remaining: Vec<SessionId>,
}

impl SessionDiff {
    pub fn is_unchanged(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// All sessions known to the process, in creation order.
///
/// Sessions are only marked inactive here; dropping them is up to the caller.
#[derive(Debug, Default)]
pub struct SessionStore {
    started: bool,
    sessions: Vec<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Seed the store from the first snapshot, replacing anything held before.
    pub fn start(
        &mut self,
        snapshot: &GuildShipsResponse,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionId>, SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        let ships = at_sea_ships(snapshot)?;
        let base = snapshot.entitlement_base();

        self.sessions = ships
            .into_iter()
            .map(|ship| Session::create(ship, base, now))
            .collect();
        self.started = true;
        debug!(sessions = self.sessions.len(), "session store started");
        Ok(self.sessions.iter().map(Session::id).collect())
    }

    /// Diff a snapshot against the active sessions.
    pub fn update(
        &mut self,
        snapshot: &GuildShipsResponse,
        now: DateTime<Utc>,
    ) -> Result<SessionDiff, SessionError> {
        if !self.started {
            return Err(SessionError::NotStarted);
        }
        let mut pool = at_sea_ships(snapshot)?;
        let base = snapshot.entitlement_base();
        let mut diff = SessionDiff::default();

        for session in self.sessions.iter_mut().filter(|s| s.is_active()) {
            match pool.iter().position(|ship| ship.id == session.ship_id()) {
                Some(index) => {
                    let outcome = session.seen(pool.remove(index), base, now);
                    debug_assert_eq!(outcome, SeenOutcome::Updated);
                    diff.remaining.push(session.id());
                }
                None => {
                    session.deactivate();
                    diff.removals.push(session.id());
                }
            }
        }

        for ship in pool {
            let session = Session::create(ship, base, now);
            diff.additions.push(session.id());
            self.sessions.push(session);
        }

        debug!(
            additions = diff.additions.len(),
            removals = diff.removals.len(),
            remaining = diff.remaining.len(),
            "roster diff applied"
        );
        Ok(diff)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|session| session.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|session| session.id() == id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(|session| session.is_active())
    }

    /// Drop an ended session. Active sessions are never removed.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        let index = self
            .sessions
            .iter()
            .position(|session| session.id() == id && !session.is_active())?;
        Some(self.sessions.remove(index))
    }
}

/// Ships at sea in `snapshot`, in roster order.
///
/// A missing ship list or a crew list above the ship class capacity is a
/// contract violation of the remote and rejects the whole snapshot.
fn at_sea_ships(snapshot: &GuildShipsResponse) -> Result<Vec<&GuildShip>, SessionError> {
    let ships = snapshot
        .ships
        .as_ref()
        .ok_or_else(|| SessionError::InvalidRemoteResponse {
            reason: "guild ships response has no ship list".to_string(),
        })?;

    let at_sea: Vec<&GuildShip> = ships.iter().filter(|ship| ship.is_at_sea()).collect();
    for ship in &at_sea {
        if let Err(count) = ship.check_crew_capacity() {
            return Err(SessionError::InvalidRemoteResponse {
                reason: format!(
                    "ship '{}' ({}) reports {count} crew, capacity is {}",
                    ship.id,
                    ship.ship_type,
                    ship.ship_type.capacity()
                ),
            });
        }
    }
    Ok(at_sea)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
