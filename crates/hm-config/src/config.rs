//! Application configuration.
//!
//! Values come from, in increasing precedence:
//! - built-in defaults
//! - `config.toml` (explicit path, or the platform config dir)
//! - `SOT_GUILD` / `SOT_RAT` environment variables

use anyhow::{Context, Result};
use hm_core::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `guild_id`.
pub const ENV_GUILD: &str = "SOT_GUILD";
/// Environment variable overriding `api.cookie`.
pub const ENV_COOKIE: &str = "SOT_RAT";

const DEFAULT_BASE_URL: &str = "https://www.seaofthieves.com";
const DEFAULT_REQUEST_DELAY_SECS: u64 = 60;
const DEFAULT_RETRY_BASE_DELAY_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_CHRONICLE_MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarbourConfig {
    /// Guild whose ships are observed.
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub chronicle: ChronicleConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Raw `Cookie` header sent with every request.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cookie: String,
    /// Minimum spacing between the start of two requests.
    #[serde(default = "default_request_delay_secs")]
    pub request_delay_secs: u64,
    /// Linear backoff unit for server-error retries.
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Localization path prefix for chronicle queries (e.g. `de`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub localization: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            cookie: String::new(),
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            retry_base_delay_secs: DEFAULT_RETRY_BASE_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            localization: String::new(),
        }
    }
}

impl ApiConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs(self.retry_base_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Which chronicle feed reconciliation reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChronicleScopeSetting {
    #[default]
    Ship,
    Guild,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronicleConfig {
    /// Failed rounds after which a reconciliation job is abandoned.
    #[serde(default = "default_chronicle_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub scope: ChronicleScopeSetting,
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CHRONICLE_MAX_ATTEMPTS,
            scope: ChronicleScopeSetting::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("harbour-master/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_delay_secs() -> u64 {
    DEFAULT_REQUEST_DELAY_SECS
}

fn default_retry_base_delay_secs() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_chronicle_max_attempts() -> u32 {
    DEFAULT_CHRONICLE_MAX_ATTEMPTS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl HarbourConfig {
    /// Load config from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    /// Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => match Self::config_path() {
                Ok(path) if path.exists() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply `SOT_GUILD` / `SOT_RAT` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(guild) = lookup(ENV_GUILD).filter(|v| !v.trim().is_empty()) {
            self.guild_id = guild.trim().to_string();
        }
        if let Some(cookie) = lookup(ENV_COOKIE).filter(|v| !v.is_empty()) {
            self.api.cookie = cookie;
        }
    }

    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> std::result::Result<(), AppError> {
        if self.guild_id.trim().is_empty() {
            return Err(AppError::MissingGuild);
        }
        if self.api.request_delay_secs == 0 {
            return Err(AppError::InvalidConfig(
                "api.request_delay_secs must be > 0".into(),
            ));
        }
        if self.poll.interval_secs == 0 {
            return Err(AppError::InvalidConfig(
                "poll.interval_secs must be > 0".into(),
            ));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::InvalidConfig("api.base_url must be set".into()));
        }
        Ok(())
    }

    /// Path to the config file: `~/.config/harbour-master/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "harbour-master")
            .context("Failed to determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Commented config template.
    pub fn default_template() -> String {
        r#"# harbour-master configuration
# Location: ~/.config/harbour-master/config.toml

# Guild to observe (SOT_GUILD overrides).
guild_id = ""

[api]
base_url = "https://www.seaofthieves.com"
# cookie = ""              # SOT_RAT overrides
request_delay_secs = 60     # minimum spacing between two requests
retry_base_delay_secs = 60  # linear backoff unit on server errors
max_retries = 3
# localization = "de"

[poll]
interval_secs = 300

[chronicle]
max_attempts = 4
scope = "ship"              # "ship" or "guild"

[log]
level = "info"
"#
        .to_string()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
