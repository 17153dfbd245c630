//! Database row types and TEXT-column codecs. Row structs map directly to
//! SQLite rows; domain enums travel as short lowercase strings.

use anyhow::{Result, anyhow, bail};
use arena_types::models::{InvitationStatus, Mark, MatchStatus, ScoreOutcome};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub password: String,
    pub created_at: String,
}

pub fn mark_to_str(mark: Mark) -> &'static str {
    match mark {
        Mark::X => "X",
        Mark::O => "O",
    }
}

pub fn mark_from_str(s: &str) -> Result<Mark> {
    match s {
        "X" => Ok(Mark::X),
        "O" => Ok(Mark::O),
        other => bail!("unknown mark '{}'", other),
    }
}

pub fn status_to_str(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Waiting => "waiting",
        MatchStatus::Active => "active",
        MatchStatus::Finished => "finished",
        MatchStatus::Abandoned => "abandoned",
    }
}

pub fn status_from_str(s: &str) -> Result<MatchStatus> {
    match s {
        "waiting" => Ok(MatchStatus::Waiting),
        "active" => Ok(MatchStatus::Active),
        "finished" => Ok(MatchStatus::Finished),
        "abandoned" => Ok(MatchStatus::Abandoned),
        other => bail!("unknown match status '{}'", other),
    }
}

pub fn outcome_to_str(outcome: ScoreOutcome) -> &'static str {
    match outcome {
        ScoreOutcome::Win => "win",
        ScoreOutcome::Loss => "loss",
        ScoreOutcome::Draw => "draw",
    }
}

pub fn outcome_from_str(s: &str) -> Result<ScoreOutcome> {
    match s {
        "win" => Ok(ScoreOutcome::Win),
        "loss" => Ok(ScoreOutcome::Loss),
        "draw" => Ok(ScoreOutcome::Draw),
        other => bail!("unknown outcome '{}'", other),
    }
}

pub fn invitation_status_to_str(status: InvitationStatus) -> &'static str {
    match status {
        InvitationStatus::Pending => "pending",
        InvitationStatus::Accepted => "accepted",
        InvitationStatus::Rejected => "rejected",
    }
}

pub fn invitation_status_from_str(s: &str) -> Result<InvitationStatus> {
    match s {
        "pending" => Ok(InvitationStatus::Pending),
        "accepted" => Ok(InvitationStatus::Accepted),
        "rejected" => Ok(InvitationStatus::Rejected),
        other => bail!("unknown invitation status '{}'", other),
    }
}

pub fn uuid_from_str(s: &str) -> Result<Uuid> {
    s.parse().map_err(|e| anyhow!("bad uuid '{}': {}", s, e))
}

pub fn timestamp_to_str(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub fn timestamp_from_str(s: &str) -> Result<DateTime<Utc>> {
    // RFC 3339 is what we write; SQLite's own datetime('now') default on
    // the users table lacks a timezone, so fall back to naive UTC.
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| anyhow!("bad timestamp '{}': {}", s, e))
}
