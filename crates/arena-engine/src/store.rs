//! Persistence contract the engine writes through. Implemented by
//! arena-db over SQLite; tests substitute an in-memory double.

use arena_types::models::{
    Invitation, LobbyMatch, MatchResult, MatchState, MoveRecord, RankingEntry,
    ScoreHistoryEntry, Seat,
};
use uuid::Uuid;

use crate::error::Result;

/// Durable store for match state, moves, results and invitations.
///
/// Every call may fail with `Error::Storage`; the engine surfaces that to
/// its caller as operation failure and performs no automatic retry.
pub trait Store: Send + Sync {
    fn load_match(&self, id: Uuid) -> Result<Option<MatchState>>;

    /// Upsert the match row together with its seat rows.
    fn save_match(&self, state: &MatchState) -> Result<()>;

    fn append_move(&self, mv: &MoveRecord) -> Result<()>;

    /// Idempotent upsert keyed on (player, match).
    fn upsert_result(&self, result: &MatchResult) -> Result<()>;

    fn find_seat(&self, match_id: Uuid, player_id: Uuid) -> Result<Option<Seat>>;

    fn create_seat(&self, match_id: Uuid, seat: &Seat) -> Result<()>;

    fn load_invitation(&self, id: Uuid) -> Result<Option<Invitation>>;

    fn save_invitation(&self, invitation: &Invitation) -> Result<()>;

    fn pending_invitation_between(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<Invitation>>;

    /// Invitations where the player is the receiver (`sent = false`) or
    /// the sender (`sent = true`), newest first.
    fn invitations_for(&self, player_id: Uuid, sent: bool) -> Result<Vec<Invitation>>;

    fn player_name(&self, player_id: Uuid) -> Result<Option<String>>;

    /// All matches as lobby summaries, newest first.
    fn list_matches(&self) -> Result<Vec<LobbyMatch>>;

    /// Move history for a match in sequence order.
    fn list_moves(&self, match_id: Uuid) -> Result<Vec<MoveRecord>>;

    /// Top players by total points, with win counts.
    fn ranking(&self, limit: u32) -> Result<Vec<RankingEntry>>;

    /// A player's per-match results.
    fn score_history(&self, player_id: Uuid) -> Result<Vec<ScoreHistoryEntry>>;
}
