//! Shared types for harbour-master: the remote roster/chronicle data model and error taxonomy.

pub mod api;
pub mod error;
pub mod types;

pub use api::{
    ANONYMOUS_GAMERTAG, ChronicleFeed, ChronicleFeedEntry, Crew, GuildShip, GuildShipsResponse,
    ResponsePaths, SailingState, ShipAccolade, ShipChronicle, ShipType,
};
pub use error::AppError;
pub use types::OutputFormat;
