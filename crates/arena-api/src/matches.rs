//! Read-only REST views over matches. Mutation happens through the
//! gateway; these endpoints back lobby pages and match replays.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use arena_types::api::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, run_blocking};

pub async fn list_matches(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let matches = run_blocking(move || registry.store().list_matches()).await?;
    Ok(Json(matches))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let state = run_blocking(move || registry.store().load_match(match_id))
        .await?
        .ok_or(ApiError(arena_engine::Error::NotFound("match")))?;
    Ok(Json(state))
}

pub async fn get_moves(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let moves = run_blocking(move || {
        let store = registry.store();
        store
            .load_match(match_id)?
            .ok_or(arena_engine::Error::NotFound("match"))?;
        store.list_moves(match_id)
    })
    .await?;
    Ok(Json(moves))
}
