//! Ship session lifecycle and chronicle reconciliation.
//!
//! [`SessionEngine`] is the synchronous core: it diffs roster snapshots into
//! sessions and matches chronicle feeds to ended sessions. [`SessionTracker`]
//! drives it against the scheduled remote API and notifies listeners.

pub mod clock;
pub mod crew;
pub mod engine;
pub mod error;
pub mod listeners;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crew::CrewMember;
pub use engine::{CycleResult, SessionEngine};
pub use error::{ReconcileError, SessionError};
pub use listeners::{ChronicleListener, ListenerRegistry, Subscription};
pub use reconcile::{DEFAULT_MAX_ATTEMPTS, FeedOutcome, Reconciler, ReconciliationJob};
pub use session::{SeenOutcome, Session, SessionId};
pub use store::{SessionDiff, SessionStore};
pub use tracker::{
    FeedScope, Reconciliations, SessionTracker, ShipReconciliation, TrackerOptions,
};
