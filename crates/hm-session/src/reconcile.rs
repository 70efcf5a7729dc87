//! Matching ended sessions to chronicle feed entries.
//!
//! Every ended session gets a [`ReconciliationJob`]. Jobs are counted down once
//! per poll cycle; when a ship has a job that is due, its feed is fetched and
//! handed back through [`Reconciler::apply_feed`]. A job that misses waits one
//! more cycle than on its previous miss, and is dropped once its attempts run
//! out.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use hm_core::ChronicleFeedEntry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::session::{Session, SessionId};
use crate::store::SessionStore;

/// Default number of failed rounds tolerated before a job is dropped.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 4;

/// Pending chronicle lookup for one ended session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationJob {
    session_id: SessionId,
    ship_id: String,
    retry_counter: i32,
    retries: i32,
}

impl ReconciliationJob {
    fn for_session(session: &Session) -> Self {
        Self {
            session_id: session.id(),
            ship_id: session.ship_id().to_string(),
            retry_counter: 1,
            retries: 0,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn ship_id(&self) -> &str {
        &self.ship_id
    }

    /// Poll cycles left before the job is due again.
    pub fn retry_counter(&self) -> i32 {
        self.retry_counter
    }

    /// Failed rounds so far.
    pub fn retries(&self) -> i32 {
        self.retries
    }

    fn is_due(&self) -> bool {
        self.retry_counter <= 0
    }
}

/// What one applied feed did to a ship's jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedOutcome {
    /// Sessions that received a chronicle, in processing order.
    pub matched: Vec<SessionId>,
    /// Sessions whose job ran out of attempts.
    pub abandoned: Vec<SessionId>,
    /// Sessions that missed and will be retried on a later cycle.
    pub deferred: Vec<SessionId>,
}

/// Pending jobs plus the set of ships whose feed is currently being fetched.
#[derive(Debug)]
pub struct Reconciler {
    jobs: Vec<ReconciliationJob>,
    in_flight: HashSet<String>,
    max_attempts: i32,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl Reconciler {
    pub fn new(max_attempts: i32) -> Self {
        Self {
            jobs: Vec::new(),
            in_flight: HashSet::new(),
            max_attempts,
        }
    }

    pub fn enqueue(&mut self, session: &Session) {
        debug!(session = %session.id(), ship_id = %session.ship_id(), "reconciliation job queued");
        self.jobs.push(ReconciliationJob::for_session(session));
    }

    /// Count every job down by one cycle and claim the ships that became due.
    ///
    /// Returned ship ids are distinct, in job order, and marked in flight until
    /// [`apply_feed`](Self::apply_feed) or [`release`](Self::release) is called
    /// for them. A ship already in flight is not returned again.
    pub fn tick(&mut self) -> Vec<String> {
        let mut due = Vec::new();
        for job in &mut self.jobs {
            job.retry_counter = job.retry_counter.saturating_sub(1);
            if job.is_due() && !self.in_flight.contains(&job.ship_id) {
                self.in_flight.insert(job.ship_id.clone());
                due.push(job.ship_id.clone());
            }
        }
        due
    }

    /// Give up on a ship's fetch without touching its jobs.
    pub fn release(&mut self, ship_id: &str) {
        self.in_flight.remove(ship_id);
    }

    /// Match a fetched feed against every pending job of `ship_id`.
    ///
    /// Jobs are processed oldest departure first. A job's window runs from its
    /// session's `last_seen` to the next job's session `first_seen`, or to `now`
    /// for the newest job, both ends inclusive. Among the entries inside the
    /// window the one with the lowest emissary value wins.
    ///
    /// `now` is the time the feed is applied, not when its fetch was issued, so
    /// the newest job's window also covers cycles that ran during the fetch.
    pub fn apply_feed(
        &mut self,
        ship_id: &str,
        feed: &[ChronicleFeedEntry],
        store: &mut SessionStore,
        now: DateTime<Utc>,
    ) -> FeedOutcome {
        self.in_flight.remove(ship_id);

        let mut ship_jobs: Vec<(SessionId, DateTime<Utc>, DateTime<Utc>)> = Vec::new();
        self.jobs.retain(|job| {
            if job.ship_id != ship_id {
                return true;
            }
            match store.get(job.session_id) {
                Some(session) => {
                    ship_jobs.push((job.session_id, session.first_seen(), session.last_seen()));
                    true
                }
                None => {
                    warn!(session = %job.session_id, ship_id, "job for unknown session dropped");
                    false
                }
            }
        });
        ship_jobs.sort_by_key(|(_, _, last_seen)| *last_seen);

        let mut outcome = FeedOutcome::default();
        for (index, (session_id, _, start)) in ship_jobs.iter().enumerate() {
            let end = ship_jobs
                .get(index + 1)
                .map_or(now, |(_, first_seen, _)| *first_seen);

            let matched = feed
                .iter()
                .filter(|entry| entry.created_at_utc >= *start && entry.created_at_utc <= end)
                .min_by_key(|entry| entry.item.emissary_value_earned);

            let Some(position) = self.jobs.iter().position(|job| job.session_id == *session_id)
            else {
                continue;
            };

            if let Some(entry) = matched {
                self.jobs.remove(position);
                if let Some(session) = store.get_mut(*session_id) {
                    session.set_chronicle(entry.item.clone());
                }
                info!(
                    session = %session_id,
                    ship_id,
                    created_at = %entry.created_at_utc,
                    "chronicle matched"
                );
                outcome.matched.push(*session_id);
                continue;
            }

            let job = &mut self.jobs[position];
            if !job.is_due() {
                outcome.deferred.push(*session_id);
                continue;
            }
            job.retries = job.retries.saturating_add(1);
            if job.retries > self.max_attempts || job.retries < 0 {
                warn!(
                    session = %session_id,
                    ship_id,
                    window_start = %start,
                    window_end = %end,
                    feed_entries = feed.len(),
                    attempts = job.retries,
                    "no matching chronicle found, giving up"
                );
                self.jobs.remove(position);
                outcome.abandoned.push(*session_id);
            } else {
                job.retry_counter = job.retries;
                debug!(
                    session = %session_id,
                    ship_id,
                    wait_cycles = job.retries,
                    "no matching chronicle yet"
                );
                outcome.deferred.push(*session_id);
            }
        }
        outcome
    }

    pub fn jobs(&self) -> &[ReconciliationJob] {
        &self.jobs
    }

    pub fn has_job(&self, session_id: SessionId) -> bool {
        self.jobs.iter().any(|job| job.session_id == session_id)
    }

    pub fn is_in_flight(&self, ship_id: &str) -> bool {
        self.in_flight.contains(ship_id)
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
