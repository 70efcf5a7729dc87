use std::time::Duration;

/// Failures of a scheduled remote call.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// A request attempt was issued before the minimum spacing elapsed.
    #[error("Rate limit: next request allowed in {}ms", retry_in.as_millis())]
    RateLimited { retry_in: Duration },

    #[error("API responded to '{resource}' with status {status}")]
    RemoteError { resource: String, status: u16 },

    #[error("API responded to '{resource}' with an empty payload")]
    EmptyPayload { resource: String },

    #[error("Too many retries on '{resource}' (statuses: {statuses:?})")]
    RetriesExhausted { resource: String, statuses: Vec<u16> },

    #[error("Request to '{resource}' failed: {message}")]
    Transport { resource: String, message: String },

    #[error("Failed to decode response of '{resource}': {source}")]
    Decode {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request scheduler is no longer running")]
    SchedulerStopped,
}

impl ApiError {
    /// Whether the server kept failing with 5xx until the retry budget ran out.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}
