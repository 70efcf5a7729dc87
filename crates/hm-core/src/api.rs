//! Wire model of the remote guild API (`guild-ships`, `ship-chronicle`, `guild-chronicle`).
//!
//! Field names follow the remote JSON (PascalCase). Unknown sailing states are
//! kept as [`SailingState::Other`] so a new state never breaks a poll.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name recorded for a crew slot whose gamertag is hidden.
pub const ANONYMOUS_GAMERTAG: &str = "Anonymous";

/// Response of the `guild-ships` query.
///
/// `ships` is optional so that a payload missing the list can be reported as an
/// invalid response by the session layer instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuildShipsResponse {
    #[serde(default)]
    pub ships: Option<Vec<GuildShip>>,
    #[serde(default)]
    pub paths: Option<ResponsePaths>,
}

impl GuildShipsResponse {
    /// Base path for sail images, if the response provided one.
    pub fn entitlement_base(&self) -> Option<&str> {
        self.paths
            .as_ref()
            .map(|paths| paths.entitlement.as_str())
            .filter(|base| !base.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponsePaths {
    #[serde(default)]
    pub entitlement: String,
}

/// One ship of the guild as reported by the roster query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuildShip {
    pub id: String,
    pub name: String,
    pub sailing_state: SailingState,
    #[serde(rename = "Type")]
    pub ship_type: ShipType,
    #[serde(default)]
    pub sail_image: String,
    #[serde(default)]
    pub alignment: String,
    /// Only present while the ship is at sea.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crew: Option<Vec<Crew>>,
}

impl GuildShip {
    pub fn is_at_sea(&self) -> bool {
        self.sailing_state == SailingState::AtSeaAvailable
    }

    pub fn crew(&self) -> &[Crew] {
        self.crew.as_deref().unwrap_or_default()
    }

    /// Checks the crew list against the ship class capacity.
    ///
    /// Returns the offending crew count when the snapshot reports more crew
    /// than the class can carry.
    pub fn check_crew_capacity(&self) -> Result<(), usize> {
        let count = self.crew().len();
        if count > self.ship_type.capacity() {
            return Err(count);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipType {
    Sloop,
    Brigantine,
    Galleon,
}

impl ShipType {
    /// Maximum number of concurrent crew members for this class.
    pub fn capacity(self) -> usize {
        match self {
            Self::Sloop => 2,
            Self::Brigantine => 3,
            Self::Galleon => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sloop => "Sloop",
            Self::Brigantine => "Brigantine",
            Self::Galleon => "Galleon",
        }
    }
}

impl std::fmt::Display for ShipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SailingState {
    NotAtSeaAvailable,
    AtSeaAvailable,
    Private,
    #[serde(other)]
    Other,
}

/// A crew slot of a ship at sea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Crew {
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub gamertag: Option<String>,
}

impl Crew {
    /// Gamertag, or the anonymous sentinel when the remote hides it.
    pub fn display_name(&self) -> &str {
        self.gamertag.as_deref().unwrap_or(ANONYMOUS_GAMERTAG)
    }
}

/// Response of the chronicle feed queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChronicleFeed {
    #[serde(default)]
    pub feed: Option<Vec<ChronicleFeedEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChronicleFeedEntry {
    pub created_at_utc: DateTime<Utc>,
    #[serde(rename = "Type", default)]
    pub kind: String,
    pub item: ShipChronicle,
}

/// Activity accrued during one voyage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShipChronicle {
    #[serde(default)]
    pub days_at_sea: i64,
    #[serde(default)]
    pub gold_earned: i64,
    #[serde(default)]
    pub reputation_earned: i64,
    #[serde(default)]
    pub emissary_value_earned: i64,
    #[serde(default)]
    pub ship_accolades: Vec<ShipAccolade>,
    #[serde(default)]
    pub ship_accolades_increased: i64,
    #[serde(default)]
    pub gamertag: String,
    #[serde(default)]
    pub ship_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShipAccolade {
    #[serde(default)]
    pub localized_title: String,
    #[serde(default)]
    pub previous_progress: i64,
    #[serde(default)]
    pub current_progress: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPS_JSON: &str = r#"{
        "Ships": [
            {
                "Id": "9c527cc0",
                "Name": "Dark Octavius",
                "SailingState": "AtSeaAvailable",
                "Type": "Sloop",
                "SailImage": "Entitlement/sail.png",
                "Alignment": "Neutral",
                "Crew": [
                    { "IsOnline": true, "Gamertag": "Dark883948" },
                    { "IsOnline": true, "Gamertag": null }
                ]
            },
            {
                "Id": "1f00aa",
                "Name": "Harbour Cat",
                "SailingState": "NotAtSeaAvailable",
                "Type": "Galleon",
                "SailImage": "Entitlement/cat.png",
                "Alignment": "Neutral"
            },
            {
                "Id": "2b11cc",
                "Name": "Ghost",
                "SailingState": "Sunk",
                "Type": "Brigantine",
                "SailImage": "x.png",
                "Alignment": ""
            }
        ],
        "Paths": { "Entitlement": "https://assets.example/2-138" }
    }"#;

    #[test]
    fn test_parse_guild_ships() {
        let response: GuildShipsResponse = serde_json::from_str(SHIPS_JSON).unwrap();
        let ships = response.ships.as_ref().unwrap();
        assert_eq!(ships.len(), 3);
        assert!(ships[0].is_at_sea());
        assert_eq!(ships[0].ship_type, ShipType::Sloop);
        assert_eq!(ships[0].crew().len(), 2);
        assert_eq!(ships[0].crew()[1].display_name(), ANONYMOUS_GAMERTAG);
        assert!(!ships[1].is_at_sea());
        assert!(ships[1].crew().is_empty());
        assert_eq!(ships[2].sailing_state, SailingState::Other);
        assert_eq!(
            response.entitlement_base(),
            Some("https://assets.example/2-138")
        );
    }

    #[test]
    fn test_missing_ship_list_parses_as_none() {
        let response: GuildShipsResponse = serde_json::from_str(r#"{"Paths":null}"#).unwrap();
        assert!(response.ships.is_none());
        assert!(response.entitlement_base().is_none());
    }

    #[test]
    fn test_parse_chronicle_feed() {
        let json = r#"{
            "Feed": [
                {
                    "CreatedAtUtc": "2024-10-31T17:59:42Z",
                    "Type": "ShipChronicle",
                    "Item": {
                        "DaysAtSea": 1,
                        "GoldEarned": 40000,
                        "ReputationEarned": 0,
                        "EmissaryValueEarned": 0,
                        "ShipAccolades": [
                            { "LocalizedTitle": "Gold Earned", "PreviousProgress": 10, "CurrentProgress": 12 }
                        ],
                        "ShipAccoladesIncreased": 4,
                        "Gamertag": "Dark883948",
                        "ShipName": "Dark Octavius"
                    }
                }
            ]
        }"#;
        let feed: ChronicleFeed = serde_json::from_str(json).unwrap();
        let entries = feed.feed.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item.gold_earned, 40000);
        assert_eq!(entries[0].item.ship_accolades.len(), 1);
        assert_eq!(
            entries[0].created_at_utc.to_rfc3339(),
            "2024-10-31T17:59:42+00:00"
        );
    }

    #[test]
    fn test_ship_type_capacity() {
        assert_eq!(ShipType::Sloop.capacity(), 2);
        assert_eq!(ShipType::Brigantine.capacity(), 3);
        assert_eq!(ShipType::Galleon.capacity(), 4);
    }

    #[test]
    fn test_crew_over_capacity_is_reported() {
        let crew = |name: &str| Crew {
            is_online: true,
            gamertag: Some(name.to_string()),
        };
        let ship = GuildShip {
            id: "s1".into(),
            name: "S1".into(),
            sailing_state: SailingState::AtSeaAvailable,
            ship_type: ShipType::Sloop,
            sail_image: String::new(),
            alignment: String::new(),
            crew: Some(vec![crew("a"), crew("b"), crew("c")]),
        };
        assert_eq!(ship.check_crew_capacity(), Err(3));
    }
}
