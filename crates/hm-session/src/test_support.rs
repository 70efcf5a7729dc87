//! Snapshot builders shared by the unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hm_core::{
    ChronicleFeedEntry, Crew, GuildShip, GuildShipsResponse, ResponsePaths, SailingState,
    ShipChronicle, ShipType,
};

pub(crate) fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 31, 17, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub(crate) fn crew(name: &str) -> Crew {
    Crew {
        is_online: true,
        gamertag: Some(name.to_string()),
    }
}

pub(crate) fn anonymous() -> Crew {
    Crew {
        is_online: true,
        gamertag: None,
    }
}

pub(crate) fn at_sea(id: &str, ship_type: ShipType, members: Vec<Crew>) -> GuildShip {
    GuildShip {
        id: id.to_string(),
        name: format!("Ship {id}"),
        sailing_state: SailingState::AtSeaAvailable,
        ship_type,
        sail_image: format!("{id}.png"),
        alignment: String::new(),
        crew: Some(members),
    }
}

pub(crate) fn in_harbour(id: &str) -> GuildShip {
    GuildShip {
        id: id.to_string(),
        name: format!("Ship {id}"),
        sailing_state: SailingState::NotAtSeaAvailable,
        ship_type: ShipType::Galleon,
        sail_image: format!("{id}.png"),
        alignment: String::new(),
        crew: None,
    }
}

pub(crate) fn snapshot(ships: Vec<GuildShip>) -> GuildShipsResponse {
    GuildShipsResponse {
        ships: Some(ships),
        paths: Some(ResponsePaths {
            entitlement: "https://cdn.example".to_string(),
        }),
    }
}

pub(crate) fn entry(at: DateTime<Utc>, emissary: i64, gold: i64) -> ChronicleFeedEntry {
    ChronicleFeedEntry {
        created_at_utc: at,
        kind: "ShipChronicle".to_string(),
        item: ShipChronicle {
            gold_earned: gold,
            emissary_value_earned: emissary,
            gamertag: "Dark883948".to_string(),
            ..Default::default()
        },
    }
}
