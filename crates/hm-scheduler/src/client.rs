//! Scheduled API client for the guild roster and chronicle feeds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hm_core::{ChronicleFeed, GuildShipsResponse};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::dispatcher::{Admission, RequestPermit, RequestScheduler, RetryGuard};
use crate::error::ApiError;
use crate::transport::{RemoteRequest, Transport};

const API_PATH: &str = "api/profilev2";
const SERVER_ERROR: u16 = 500;
const OK: u16 = 200;

/// Which chronicle feed to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChronicleScope {
    Ship(String),
    Guild,
}

impl ChronicleScope {
    /// Ship scope, falling back to the guild feed for an empty id.
    pub fn for_ship(ship_id: &str) -> Self {
        if ship_id.is_empty() {
            Self::Guild
        } else {
            Self::Ship(ship_id.to_string())
        }
    }
}

/// Roster and chronicle access as consumed by the session engine.
#[async_trait]
pub trait RosterApi: Send + Sync {
    async fn guild_ships(
        &self,
        admission: Admission,
        guild_id: &str,
    ) -> Result<GuildShipsResponse, ApiError>;

    async fn chronicle_feed(
        &self,
        admission: Admission,
        guild_id: &str,
        scope: ChronicleScope,
    ) -> Result<ChronicleFeed, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    pub base_url: String,
    pub localization: Option<String>,
    pub retry_base_delay: Duration,
    pub max_retries: u32,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            base_url: "https://www.seaofthieves.com".to_string(),
            localization: None,
            retry_base_delay: Duration::from_secs(60),
            max_retries: 3,
        }
    }
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    scheduler: RequestScheduler,
    options: ApiClientOptions,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        scheduler: RequestScheduler,
        mut options: ApiClientOptions,
    ) -> Self {
        options.base_url = options.base_url.trim_end_matches('/').to_string();
        options.localization = options.localization.filter(|loc| !loc.is_empty());
        Self {
            transport,
            scheduler,
            options,
        }
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    /// Perform a GET under `permit`, retrying server errors with linear backoff.
    ///
    /// While retries are outstanding the scheduler hands out no other permits.
    pub async fn get<T: DeserializeOwned>(
        &self,
        permit: RequestPermit,
        request: RemoteRequest,
    ) -> Result<T, ApiError> {
        debug!(
            resource = %request.resource,
            admission = ?permit.admission(),
            "issuing request"
        );
        drop(permit);

        let mut statuses: Vec<u16> = Vec::new();
        let mut retry_guard: Option<RetryGuard> = None;
        loop {
            let response = self
                .transport
                .get(&request)
                .await
                .map_err(|err| ApiError::Transport {
                    resource: request.resource.clone(),
                    message: format!("{err:#}"),
                })?;

            match response.status {
                OK => return decode(&request.resource, &response.body),
                SERVER_ERROR => {
                    statuses.push(response.status);
                    if statuses.len() > self.options.max_retries as usize {
                        return Err(ApiError::RetriesExhausted {
                            resource: request.resource,
                            statuses,
                        });
                    }
                    if retry_guard.is_none() {
                        retry_guard = Some(self.scheduler.begin_retry());
                    }
                    let attempt = statuses.len() as u32;
                    let backoff = self.options.retry_base_delay * attempt;
                    warn!(
                        resource = %request.resource,
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        "server error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    self.wait_for_retry_slot(&request.resource).await?;
                }
                status => {
                    return Err(ApiError::RemoteError {
                        resource: request.resource,
                        status,
                    });
                }
            }
        }
    }

    /// Claim the clock for a retry, waiting out whatever spacing is still owed.
    ///
    /// The retry guard keeps other permits from being granted meanwhile, so
    /// the second claim after waiting `retry_in` succeeds.
    async fn wait_for_retry_slot(&self, resource: &str) -> Result<(), ApiError> {
        loop {
            match self.scheduler.retry_attempt().await {
                Err(ApiError::RateLimited { retry_in }) => {
                    debug!(
                        resource,
                        wait_secs = retry_in.as_secs(),
                        "retry waits for request spacing"
                    );
                    tokio::time::sleep(retry_in).await;
                }
                claimed => return claimed,
            }
        }
    }

    /// Current ships of a guild.
    pub async fn get_guild_ships(
        &self,
        permit: RequestPermit,
        guild_id: &str,
    ) -> Result<GuildShipsResponse, ApiError> {
        let request = RemoteRequest {
            resource: "guild-ships".to_string(),
            url: format!("{}/{API_PATH}/guild-ships", self.options.base_url),
            query: vec![("guild".to_string(), guild_id.to_string())],
            referer: Some(self.referer(guild_id)),
        };
        self.get(permit, request).await
    }

    /// Chronicle feed of one ship, or of the whole guild.
    pub async fn get_chronicles(
        &self,
        permit: RequestPermit,
        guild_id: &str,
        scope: &ChronicleScope,
    ) -> Result<ChronicleFeed, ApiError> {
        self.get(permit, self.chronicle_request(guild_id, scope)).await
    }

    fn chronicle_request(&self, guild_id: &str, scope: &ChronicleScope) -> RemoteRequest {
        let localization = self
            .options
            .localization
            .as_deref()
            .map(|loc| format!("{loc}/"))
            .unwrap_or_default();
        let mut query = vec![("guild".to_string(), guild_id.to_string())];
        let resource = match scope {
            ChronicleScope::Ship(ship_id) => {
                query.push(("ship".to_string(), ship_id.clone()));
                "ship-chronicle"
            }
            ChronicleScope::Guild => "guild-chronicle",
        };
        RemoteRequest {
            resource: resource.to_string(),
            url: format!(
                "{}/{localization}{API_PATH}/{resource}",
                self.options.base_url
            ),
            query,
            referer: Some(self.referer(guild_id)),
        }
    }

    fn referer(&self, guild_id: &str) -> String {
        let fallback = format!("{}/profile/guilds/{guild_id}/", self.options.base_url);
        let Ok(mut url) = Url::parse(&self.options.base_url) else {
            return fallback;
        };
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments
                    .pop_if_empty()
                    .extend(["profile", "guilds", guild_id, ""]);
            }
            Err(()) => return fallback,
        }
        url.to_string()
    }
}

#[async_trait]
impl RosterApi for ApiClient {
    async fn guild_ships(
        &self,
        admission: Admission,
        guild_id: &str,
    ) -> Result<GuildShipsResponse, ApiError> {
        let permit = self.scheduler.wait(admission).await?;
        self.get_guild_ships(permit, guild_id).await
    }

    async fn chronicle_feed(
        &self,
        admission: Admission,
        guild_id: &str,
        scope: ChronicleScope,
    ) -> Result<ChronicleFeed, ApiError> {
        let permit = self.scheduler.wait(admission).await?;
        self.get_chronicles(permit, guild_id, &scope).await
    }
}

fn decode<T: DeserializeOwned>(resource: &str, body: &str) -> Result<T, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(ApiError::EmptyPayload {
            resource: resource.to_string(),
        });
    }
    serde_json::from_str(trimmed).map_err(|source| ApiError::Decode {
        resource: resource.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
