use hm_scheduler::ApiError;

use crate::session::SessionId;

/// Failures of `start` / `update`.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Can not start an already started session store")]
    AlreadyStarted,

    #[error("Session store has not been started")]
    NotStarted,

    #[error("Invalid remote response: {reason}")]
    InvalidRemoteResponse { reason: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failures of one ship's reconciliation round.
///
/// Job bookkeeping for the round is complete before any of these surface.
#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to fetch chronicle feed for ship '{ship_id}': {source}")]
    Fetch {
        ship_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Chronicle feed for ship '{ship_id}' has no entry list")]
    InvalidFeed { ship_id: String },

    #[error("Chronicle listener failed for session {session_id}: {source:#}")]
    Listener {
        session_id: SessionId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Reconciliation task aborted: {0}")]
    Task(String),
}
