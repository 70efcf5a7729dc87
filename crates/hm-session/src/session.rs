//! A ship's continuous stay at sea and its crew roster.

use chrono::{DateTime, Utc};
use hm_core::{GuildShip, SailingState, ShipChronicle, ShipType};
use serde::Serialize;
use tracing::warn;
use ulid::Ulid;

use crate::crew::CrewMember;

/// Stable opaque session identifier (ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(Ulid);

impl SessionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of applying a roster observation to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenOutcome {
    Updated,
    /// The session already ended; nothing changed.
    Inactive,
    /// The observed ship is not this session's ship; nothing changed.
    ShipMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    id: SessionId,
    ship_id: String,
    ship_name: String,
    ship_type: ShipType,
    sail_image: String,
    sailing_state: SailingState,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    active: bool,
    crew: Vec<CrewMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chronicle: Option<ShipChronicle>,
}

impl Session {
    /// Start a session for a ship observed at sea.
    pub fn create(ship: &GuildShip, image_base: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            ship_id: ship.id.clone(),
            ship_name: ship.name.clone(),
            ship_type: ship.ship_type,
            sail_image: with_base(&ship.sail_image, image_base),
            sailing_state: ship.sailing_state,
            first_seen: now,
            last_seen: now,
            active: true,
            crew: ship
                .crew()
                .iter()
                .map(|crew| CrewMember::new(crew.display_name(), now))
                .collect(),
            chronicle: None,
        }
    }

    /// Apply a later observation of the same ship.
    ///
    /// Crew still listed are marked seen, crew no longer listed are deactivated,
    /// and newly listed crew are appended in roster order.
    pub fn seen(
        &mut self,
        ship: &GuildShip,
        image_base: Option<&str>,
        now: DateTime<Utc>,
    ) -> SeenOutcome {
        if !self.active {
            warn!(
                session = %self.id,
                ship_id = %ship.id,
                "observation for inactive session ignored"
            );
            return SeenOutcome::Inactive;
        }
        if self.ship_id != ship.id {
            warn!(
                session = %self.id,
                expected = %self.ship_id,
                observed = %ship.id,
                "observation for a different ship ignored"
            );
            return SeenOutcome::ShipMismatch;
        }

        self.sail_image = with_base(&ship.sail_image, image_base);
        self.sailing_state = ship.sailing_state;
        if now > self.last_seen {
            self.last_seen = now;
        }

        let mut present: Vec<&str> = ship.crew().iter().map(|crew| crew.display_name()).collect();
        for member in self.crew.iter_mut().filter(|member| member.is_active()) {
            match present.iter().position(|name| *name == member.gamertag()) {
                Some(index) => {
                    member.seen(now);
                    present.remove(index);
                }
                None => member.deactivate(),
            }
        }
        self.crew
            .extend(present.into_iter().map(|name| CrewMember::new(name, now)));

        SeenOutcome::Updated
    }

    /// End the session and every crew membership still open.
    pub fn deactivate(&mut self) {
        for member in &mut self.crew {
            member.deactivate();
        }
        self.active = false;
    }

    pub(crate) fn set_chronicle(&mut self, chronicle: ShipChronicle) {
        self.chronicle = Some(chronicle);
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn ship_id(&self) -> &str {
        &self.ship_id
    }

    pub fn ship_name(&self) -> &str {
        &self.ship_name
    }

    pub fn ship_type(&self) -> ShipType {
        self.ship_type
    }

    pub fn sail_image(&self) -> &str {
        &self.sail_image
    }

    pub fn sailing_state(&self) -> SailingState {
        self.sailing_state
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

    /// Crew in discovery order, inactive members included.
    pub fn crew(&self) -> &[CrewMember] {
        &self.crew
    }

    pub fn active_crew(&self) -> impl Iterator<Item = &CrewMember> {
        self.crew.iter().filter(|member| member.is_active())
    }

    pub fn chronicle(&self) -> Option<&ShipChronicle> {
        self.chronicle.as_ref()
    }
}

fn with_base(image: &str, base: Option<&str>) -> String {
    match base {
        Some(base) => format!("{base}/{image}"),
        None => image.to_string(),
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
