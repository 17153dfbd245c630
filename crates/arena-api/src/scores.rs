use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use arena_types::api::{Claims, RankingQuery};

use crate::auth::AppState;
use crate::error::{ApiResult, run_blocking};

pub async fn get_ranking(
    State(state): State<AppState>,
    Query(query): Query<RankingQuery>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let limit = query.limit.min(100);
    let entries = run_blocking(move || registry.store().ranking(limit)).await?;
    Ok(Json(entries))
}

pub async fn get_score_history(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.clone();
    let history = run_blocking(move || {
        let store = registry.store();
        store
            .player_name(player_id)?
            .ok_or(arena_engine::Error::NotFound("player"))?;
        store.score_history(player_id)
    })
    .await?;
    Ok(Json(history))
}
