use std::sync::Arc;

use anyhow::{Context, Result};
use hm_config::HarbourConfig;
use hm_core::{AppError, OutputFormat};
use hm_session::{Reconciliations, Session, SessionId, SessionTracker};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::report::{ReportEvent, ReportListener, render};
use crate::services;

/// Poll the roster every `poll.interval_secs` until interrupted or an update fails.
pub(crate) async fn handle_watch(config: HarbourConfig, format: OutputFormat) -> Result<()> {
    config.validate()?;
    let tracker = services::build_tracker(&config)?;
    tracker.subscribe(Arc::new(ReportListener::new(format)));

    info!(guild = %config.guild_id.trim(), "starting session tracking");
    let sessions = tracker
        .start()
        .await
        .context("Failed to start session tracking")?;
    for session in &sessions {
        print_report(ReportEvent::Started, session, format)?;
    }

    let mut interval = tokio::time::interval(config.poll.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the first update is one interval after start.
    interval.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut cycles: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!(cycles, "interrupted, stopping session tracking");
                return Ok(());
            }
        }
        cycles += 1;
        info!(cycle = cycles, "session update started");

        let (diff, rounds) = match tracker.update().await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "stopping session tracking due to error");
                return Err(AppError::PollStopped {
                    cycles,
                    reason: err.to_string(),
                }
                .into());
            }
        };

        let events = diff
            .additions
            .iter()
            .map(|id| (ReportEvent::Started, *id))
            .chain(diff.removals.iter().map(|id| (ReportEvent::Ended, *id)))
            .chain(diff.remaining.iter().map(|id| (ReportEvent::Continued, *id)));
        for (event, id) in events {
            if let Some(session) = tracker.session(id) {
                print_report(event, &session, format)?;
            }
        }

        if !rounds.is_empty() {
            tokio::spawn(drain_reconciliations(tracker.clone(), rounds));
        }
        info!(cycle = cycles, "session update finished");
    }
}

/// Log every round's result and drop sessions that are fully resolved.
///
/// A listener failure does not keep its session alive; the chronicle is
/// already recorded by then.
async fn drain_reconciliations(tracker: SessionTracker, mut rounds: Reconciliations) {
    while let Some(result) = rounds.next().await {
        match result {
            Ok(round) => {
                for err in &round.listener_errors {
                    warn!(ship_id = %round.ship_id, error = %err, "chronicle listener failed");
                }
                for id in round.resolved() {
                    forget(&tracker, id);
                }
            }
            Err(err) => warn!(error = %err, "chronicle reconciliation failed"),
        }
    }
}

fn forget(tracker: &SessionTracker, id: SessionId) {
    if tracker.forget(id).is_none() {
        warn!(session = %id, "resolved session could not be released");
    }
}

fn print_report(event: ReportEvent, session: &Session, format: OutputFormat) -> Result<()> {
    println!("{}", render(event, session, format)?);
    Ok(())
}
