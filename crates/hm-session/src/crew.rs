use chrono::{DateTime, Utc};
use serde::Serialize;

/// One crew member's presence inside a session.
///
/// Deactivation is permanent: a member who leaves and rejoins is recorded as a
/// new `CrewMember`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrewMember {
    gamertag: String,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    active: bool,
}

impl CrewMember {
    pub fn new(gamertag: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            gamertag: gamertag.into(),
            first_seen: now,
            last_seen: now,
            active: true,
        }
    }

    pub fn gamertag(&self) -> &str {
        &self.gamertag
    }

    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record presence at `now`. Returns `false` (and changes nothing) once inactive.
    pub fn seen(&mut self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if now > self.last_seen {
            self.last_seen = now;
        }
        true
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
