use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    LobbyMatch, Mark, MatchState, MoveRecord, PresenceEntry, RankingEntry,
};

/// Broadcast scope for a gateway event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Lobby,
    Match(Uuid),
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Enter the lobby (receive lobby/ranking broadcasts, appear in presence)
    JoinLobby,

    /// Leave the lobby
    LeaveLobby,

    /// Create a fresh waiting match
    CreateMatch { title: String },

    /// Take a seat in a match and subscribe to its room
    JoinMatch { match_id: Uuid },

    /// Place a mark on a cell (0-8)
    MakeMove { match_id: Uuid, cell: usize },

    /// Unsubscribe from a match room
    LeaveMatch { match_id: Uuid },

    /// In-match chat message
    Chat { match_id: Uuid, message: String },

    /// Request a fresh lobby snapshot
    GetLobby,

    /// Request the current ranking
    GetRanking,
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { player_id: Uuid, name: String },

    /// Full lobby snapshot: open/active matches plus connected presence
    LobbyUpdate {
        matches: Vec<LobbyMatch>,
        presence: Vec<PresenceEntry>,
    },

    /// Sent to the creator after CreateMatch
    MatchCreated { state: MatchState },

    /// Sent to the joiner after a successful JoinMatch
    JoinSuccess { state: MatchState, mark: Mark },

    /// A player took a seat in the match
    PlayerJoined {
        match_id: Uuid,
        player_id: Uuid,
        name: String,
    },

    /// Authoritative match snapshot after any state change
    MatchUpdate { state: MatchState },

    /// Both seats filled, gameplay begins
    MatchStarted { state: MatchState },

    /// A move was applied
    MoveMade {
        state: MatchState,
        mv: MoveRecord,
        winning_line: Option<[usize; 3]>,
    },

    /// The match reached a terminal state
    MatchFinished {
        match_id: Uuid,
        winner_id: Option<Uuid>,
        is_draw: bool,
        winning_line: Option<[usize; 3]>,
    },

    /// A player left the match room
    PlayerLeft {
        match_id: Uuid,
        player_id: Uuid,
        name: String,
    },

    /// In-match chat relay
    Chat {
        match_id: Uuid,
        player_id: Uuid,
        name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Current top ranking
    RankingUpdate { entries: Vec<RankingEntry> },

    /// A move was rejected; sent only to the acting connection
    MoveError { message: String, cell: usize },

    /// Generic command failure; sent only to the acting connection
    Error { message: String },
}

impl GatewayEvent {
    /// Returns the room this event is scoped to. Events that return `None`
    /// are targeted (sent directly to one connection) and never enter the
    /// broadcast channel.
    pub fn room(&self) -> Option<Room> {
        match self {
            Self::LobbyUpdate { .. } | Self::RankingUpdate { .. } => Some(Room::Lobby),
            Self::PlayerJoined { match_id, .. }
            | Self::MatchFinished { match_id, .. }
            | Self::PlayerLeft { match_id, .. }
            | Self::Chat { match_id, .. } => Some(Room::Match(*match_id)),
            Self::MatchUpdate { state }
            | Self::MatchStarted { state }
            | Self::MoveMade { state, .. } => Some(Room::Match(state.id)),
            // Ready, MatchCreated, JoinSuccess, MoveError, Error are targeted
            _ => None,
        }
    }
}
