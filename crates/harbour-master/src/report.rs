//! Session reports printed by `watch`.

use std::cmp::Ordering;
use std::fmt::Write as _;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hm_core::OutputFormat;
use hm_session::{ChronicleListener, CrewMember, Session};
use serde::Serialize;

/// Crew lines shown per report; the rest is summarised.
const MAX_CREW_LINES: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReportEvent {
    Started,
    Continued,
    Ended,
    Chronicle,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    event: ReportEvent,
    session: &'a Session,
}

pub(crate) fn render(
    event: ReportEvent,
    session: &Session,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&JsonReport { event, session })?),
        OutputFormat::Text => Ok(render_text(session)),
    }
}

fn render_text(session: &Session) -> String {
    let mut out = String::new();
    let status = if session.is_active() {
        "is at sea"
    } else {
        "is back in port"
    };
    let _ = writeln!(
        out,
        "== {} ({}) {status} ==",
        session.ship_name(),
        session.ship_type()
    );
    let _ = writeln!(out, "Set sail:  {}", timestamp(session.first_seen()));
    if session.is_active() {
        let _ = writeln!(out, "Currently on the high seas");
    } else {
        let _ = writeln!(out, "Returned:  {}", timestamp(session.last_seen()));
    }

    let crew = sorted_crew(session.crew());
    if !crew.is_empty() {
        let _ = writeln!(out, "Crew:");
    }
    for member in crew.iter().take(MAX_CREW_LINES) {
        let presence = if member.is_active() {
            "aboard".to_string()
        } else {
            format!("left {}", timestamp(member.last_seen()))
        };
        let _ = writeln!(
            out,
            "  {:<24} joined {}, {presence}",
            member.gamertag(),
            timestamp(member.first_seen())
        );
    }
    if crew.len() > MAX_CREW_LINES {
        let _ = writeln!(out, "  ... and {} more", crew.len() - MAX_CREW_LINES);
    }

    if let Some(chronicle) = session.chronicle() {
        let _ = writeln!(
            out,
            "Gold: {} | Emissary value: {} | Reputation: {} | Accolades: {}",
            chronicle.gold_earned,
            chronicle.emissary_value_earned,
            chronicle.reputation_earned,
            chronicle.ship_accolades_increased
        );
    }
    out
}

/// Active members first; within each group by join time, then leave time.
fn sorted_crew(crew: &[CrewMember]) -> Vec<&CrewMember> {
    let mut sorted: Vec<&CrewMember> = crew.iter().collect();
    sorted.sort_by(|a, b| match (a.is_active(), b.is_active()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .first_seen()
            .cmp(&b.first_seen())
            .then(a.last_seen().cmp(&b.last_seen())),
    });
    sorted
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Prints a report for every session that received its chronicle.
pub(crate) struct ReportListener {
    format: OutputFormat,
}

impl ReportListener {
    pub(crate) fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl ChronicleListener for ReportListener {
    async fn on_chronicle_updated(&self, session: &Session) -> Result<()> {
        println!("{}", render(ReportEvent::Chronicle, session, self.format)?);
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
