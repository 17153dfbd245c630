use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every match seats exactly two players.
pub const MATCH_CAPACITY: usize = 2;

/// Symbol placed on a board cell. First seat plays X, second plays O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// Mark assigned to the n-th seat (0-based join order).
    pub fn for_seat(index: usize) -> Mark {
        if index == 0 { Mark::X } else { Mark::O }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Active,
    Finished,
    Abandoned,
}

impl MatchStatus {
    /// Terminal matches accept no further gameplay mutation.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Abandoned)
    }
}

/// 3x3 board, serialized as a 9-element array of nullable marks
/// (row-major: cells 0-2 top row, 3-5 middle, 6-8 bottom).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board(pub [Option<Mark>; 9]);

impl Board {
    pub fn cell(&self, index: usize) -> Option<Mark> {
        self.0.get(index).copied().flatten()
    }

    pub fn filled(&self) -> usize {
        self.0.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(|c| c.is_some())
    }
}

/// A player's slot within a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: Uuid,
    pub name: String,
    pub mark: Mark,
    pub has_turn: bool,
}

/// Authoritative state of one match. Owned by the match session for the
/// session's lifetime; everyone else sees snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    pub id: Uuid,
    pub title: String,
    pub capacity: u32,
    pub status: MatchStatus,
    pub board: Board,
    pub seats: Vec<Seat>,
    pub turn_holder: Option<Uuid>,
    pub turn_count: u32,
    pub winner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchState {
    pub fn new(id: Uuid, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            capacity: MATCH_CAPACITY as u32,
            status: MatchStatus::Waiting,
            board: Board::default(),
            seats: Vec::new(),
            turn_holder: None,
            turn_count: 0,
            winner: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn seat_of(&self, player_id: Uuid) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player_id == player_id)
    }

    pub fn seat_with_mark(&self, mark: Mark) -> Option<&Seat> {
        self.seats.iter().find(|s| s.mark == mark)
    }

    pub fn summary(&self) -> LobbyMatch {
        LobbyMatch {
            id: self.id,
            title: self.title.clone(),
            status: self.status,
            capacity: self.capacity,
            seated: self.seats.len() as u32,
            created_at: self.created_at,
        }
    }
}

/// Immutable record of one applied move. `seq` is 1-based and gapless
/// per match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub cell: usize,
    pub mark: Mark,
    pub seq: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOutcome {
    Win,
    Loss,
    Draw,
}

/// Per-(player, match) settlement record. At most one per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub player_id: Uuid,
    pub match_id: Uuid,
    pub points: i64,
    pub outcome: ScoreOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: InvitationStatus,
    pub match_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub player_id: Uuid,
    pub name: String,
    pub total_points: i64,
    pub wins: i64,
}

/// Match summary shown in the lobby list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyMatch {
    pub id: Uuid,
    pub title: String,
    pub status: MatchStatus,
    pub capacity: u32,
    pub seated: u32,
    pub created_at: DateTime<Utc>,
}

/// A connected lobby member. Derived live from gateway membership,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub player_id: Uuid,
    pub name: String,
}

/// One entry of a player's per-match score history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    pub match_id: Uuid,
    pub match_title: String,
    pub match_status: MatchStatus,
    pub points: i64,
    pub outcome: ScoreOutcome,
}
