use std::sync::Arc;

use anyhow::{Context, Result};
use hm_config::{ChronicleScopeSetting, HarbourConfig};
use hm_scheduler::{ApiClient, ApiClientOptions, HttpTransport, RequestScheduler};
use hm_session::{FeedScope, SessionTracker, SystemClock, TrackerOptions};

/// Build the scheduled API client. Spawns the dispatcher on the current runtime.
pub(crate) fn build_client(config: &HarbourConfig) -> Result<ApiClient> {
    let transport = HttpTransport::new(&config.api.user_agent, &config.api.cookie)
        .context("Failed to set up HTTP transport")?;
    let scheduler = RequestScheduler::spawn(config.api.request_delay());
    Ok(ApiClient::new(
        Arc::new(transport),
        scheduler,
        client_options(config),
    ))
}

pub(crate) fn build_tracker(config: &HarbourConfig) -> Result<SessionTracker> {
    let client = build_client(config)?;
    Ok(SessionTracker::new(
        Arc::new(client),
        Arc::new(SystemClock),
        tracker_options(config),
    ))
}

fn client_options(config: &HarbourConfig) -> ApiClientOptions {
    ApiClientOptions {
        base_url: config.api.base_url.clone(),
        localization: Some(config.api.localization.trim().to_string()),
        retry_base_delay: config.api.retry_base_delay(),
        max_retries: config.api.max_retries,
    }
}

fn tracker_options(config: &HarbourConfig) -> TrackerOptions {
    let mut options = TrackerOptions::new(config.guild_id.trim());
    options.max_attempts = i32::try_from(config.chronicle.max_attempts).unwrap_or(i32::MAX);
    options.scope = match config.chronicle.scope {
        ChronicleScopeSetting::Ship => FeedScope::Ship,
        ChronicleScopeSetting::Guild => FeedScope::Guild,
    };
    options
}
