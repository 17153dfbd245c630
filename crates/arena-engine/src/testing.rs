//! In-memory `Store` double for engine tests, with a switch to make every
//! write fail so rollback paths can be exercised.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use arena_types::models::{
    Invitation, LobbyMatch, MatchResult, MatchState, MoveRecord, RankingEntry,
    ScoreHistoryEntry, ScoreOutcome, Seat,
};
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;

#[derive(Default)]
struct Inner {
    matches: HashMap<Uuid, MatchState>,
    seats: HashMap<(Uuid, Uuid), Seat>,
    moves: Vec<MoveRecord>,
    results: HashMap<(Uuid, Uuid), MatchResult>,
    invitations: HashMap<Uuid, Invitation>,
    players: HashMap<Uuid, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
    fail_match_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .lock()
            .unwrap()
            .players
            .insert(id, name.to_string());
        id
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail only `save_match`, leaving other writes (seat rows, moves)
    /// to land. Exercises partial-persistence recovery paths.
    pub fn fail_match_saves(&self, fail: bool) {
        self.fail_match_saves.store(fail, Ordering::SeqCst);
    }

    pub fn results_for(&self, match_id: Uuid) -> Vec<MatchResult> {
        self.inner
            .lock()
            .unwrap()
            .results
            .values()
            .filter(|r| r.match_id == match_id)
            .cloned()
            .collect()
    }

    fn write_guard(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated storage failure").into());
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load_match(&self, id: Uuid) -> Result<Option<MatchState>> {
        Ok(self.inner.lock().unwrap().matches.get(&id).cloned())
    }

    fn save_match(&self, state: &MatchState) -> Result<()> {
        self.write_guard()?;
        if self.fail_match_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated match save failure").into());
        }
        self.inner
            .lock()
            .unwrap()
            .matches
            .insert(state.id, state.clone());
        Ok(())
    }

    fn append_move(&self, mv: &MoveRecord) -> Result<()> {
        self.write_guard()?;
        let mut inner = self.inner.lock().unwrap();
        if inner
            .moves
            .iter()
            .any(|m| m.match_id == mv.match_id && m.seq == mv.seq)
        {
            return Err(anyhow!("duplicate move seq {}", mv.seq).into());
        }
        inner.moves.push(mv.clone());
        Ok(())
    }

    fn upsert_result(&self, result: &MatchResult) -> Result<()> {
        self.write_guard()?;
        self.inner
            .lock()
            .unwrap()
            .results
            .insert((result.player_id, result.match_id), result.clone());
        Ok(())
    }

    fn find_seat(&self, match_id: Uuid, player_id: Uuid) -> Result<Option<Seat>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .seats
            .get(&(match_id, player_id))
            .cloned())
    }

    fn create_seat(&self, match_id: Uuid, seat: &Seat) -> Result<()> {
        self.write_guard()?;
        self.inner
            .lock()
            .unwrap()
            .seats
            .insert((match_id, seat.player_id), seat.clone());
        Ok(())
    }

    fn load_invitation(&self, id: Uuid) -> Result<Option<Invitation>> {
        Ok(self.inner.lock().unwrap().invitations.get(&id).cloned())
    }

    fn save_invitation(&self, invitation: &Invitation) -> Result<()> {
        self.write_guard()?;
        self.inner
            .lock()
            .unwrap()
            .invitations
            .insert(invitation.id, invitation.clone());
        Ok(())
    }

    fn pending_invitation_between(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<Invitation>> {
        use arena_types::models::InvitationStatus;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .invitations
            .values()
            .find(|i| {
                i.sender_id == sender_id
                    && i.receiver_id == receiver_id
                    && i.status == InvitationStatus::Pending
            })
            .cloned())
    }

    fn invitations_for(&self, player_id: Uuid, sent: bool) -> Result<Vec<Invitation>> {
        let inner = self.inner.lock().unwrap();
        let mut found: Vec<Invitation> = inner
            .invitations
            .values()
            .filter(|i| {
                if sent {
                    i.sender_id == player_id
                } else {
                    i.receiver_id == player_id
                }
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    fn player_name(&self, player_id: Uuid) -> Result<Option<String>> {
        Ok(self.inner.lock().unwrap().players.get(&player_id).cloned())
    }

    fn list_matches(&self) -> Result<Vec<LobbyMatch>> {
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<LobbyMatch> =
            inner.matches.values().map(|m| m.summary()).collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    fn list_moves(&self, match_id: Uuid) -> Result<Vec<MoveRecord>> {
        let inner = self.inner.lock().unwrap();
        let mut moves: Vec<MoveRecord> = inner
            .moves
            .iter()
            .filter(|m| m.match_id == match_id)
            .cloned()
            .collect();
        moves.sort_by_key(|m| m.seq);
        Ok(moves)
    }

    fn ranking(&self, limit: u32) -> Result<Vec<RankingEntry>> {
        let inner = self.inner.lock().unwrap();
        let mut totals: HashMap<Uuid, (i64, i64)> = HashMap::new();
        for result in inner.results.values() {
            let entry = totals.entry(result.player_id).or_default();
            entry.0 += result.points;
            if result.outcome == ScoreOutcome::Win {
                entry.1 += 1;
            }
        }
        let mut entries: Vec<RankingEntry> = totals
            .into_iter()
            .map(|(player_id, (total_points, wins))| RankingEntry {
                player_id,
                name: inner
                    .players
                    .get(&player_id)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                total_points,
                wins,
            })
            .collect();
        entries.sort_by(|a, b| b.total_points.cmp(&a.total_points));
        entries.truncate(limit as usize);
        Ok(entries)
    }

    fn score_history(&self, player_id: Uuid) -> Result<Vec<ScoreHistoryEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .results
            .values()
            .filter(|r| r.player_id == player_id)
            .map(|r| {
                let state = inner.matches.get(&r.match_id);
                ScoreHistoryEntry {
                    match_id: r.match_id,
                    match_title: state.map(|m| m.title.clone()).unwrap_or_default(),
                    match_status: state
                        .map(|m| m.status)
                        .unwrap_or(arena_types::models::MatchStatus::Finished),
                    points: r.points,
                    outcome: r.outcome,
                }
            })
            .collect())
    }
}
