use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared across arena-api (REST middleware) and arena-gateway
/// (WebSocket identify handshake). Canonical definition lives here in
/// arena-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub player_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub player_id: Uuid,
    pub name: String,
    pub token: String,
}

// -- Invitations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendInvitationRequest {
    pub receiver_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub invitation: crate::models::Invitation,
    pub state: crate::models::MatchState,
}

// -- Matches --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMatchRequest {
    pub title: String,
}

// -- Ranking --

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    #[serde(default = "default_ranking_limit")]
    pub limit: u32,
}

fn default_ranking_limit() -> u32 {
    10
}
