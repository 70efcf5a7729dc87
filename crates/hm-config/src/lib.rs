//! Configuration loading for harbour-master (`~/.config/harbour-master/config.toml`).

pub mod config;

pub use config::{
    ApiConfig, ChronicleConfig, ChronicleScopeSetting, ENV_COOKIE, ENV_GUILD, HarbourConfig,
    LogConfig, PollConfig,
};
