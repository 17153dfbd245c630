//! Invitation REST surface. Accepting an invitation seeds a match with
//! both players, so the lobby is refreshed over the gateway afterwards.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use arena_engine::invitation;
use arena_types::api::{AcceptInvitationResponse, Claims, SendInvitationRequest};

use crate::auth::AppState;
use crate::error::{ApiResult, run_blocking};

pub async fn send_invitation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendInvitationRequest>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let sender_id = claims.sub;
    let invitation = run_blocking(move || {
        invitation::send(registry.store().as_ref(), sender_id, req.receiver_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(invitation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let receiver_id = claims.sub;
    let (invitation, match_state) = run_blocking(move || {
        invitation::accept(&registry, receiver_id, invitation_id)
    })
    .await?;

    // The seeded match changes what the lobby shows.
    arena_gateway::lobby::refresh(&state.registry, &state.dispatcher).await;

    Ok(Json(AcceptInvitationResponse {
        invitation,
        state: match_state,
    }))
}

pub async fn reject_invitation(
    State(state): State<AppState>,
    Path(invitation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let receiver_id = claims.sub;
    let invitation = run_blocking(move || {
        invitation::reject(registry.store().as_ref(), receiver_id, invitation_id)
    })
    .await?;
    Ok(Json(invitation))
}

pub async fn received_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    list_invitations(state, claims.sub, false).await
}

pub async fn sent_invitations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    list_invitations(state, claims.sub, true).await
}

async fn list_invitations(
    state: AppState,
    player_id: Uuid,
    sent: bool,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let invitations =
        run_blocking(move || registry.store().invitations_for(player_id, sent)).await?;
    Ok(Json(invitations))
}
