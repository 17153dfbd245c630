//! Engine error to HTTP response mapping shared by every handler.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

pub struct ApiError(pub arena_engine::Error);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<arena_engine::Error> for ApiError {
    fn from(e: arena_engine::Error) -> Self {
        Self(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(arena_engine::Error::Storage(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use arena_engine::Error::*;

        let status = match &self.0 {
            InvalidCell(_) | CellOccupied(_) | MatchNotActive | MatchFull
            | NotASeatHolder | NotYourTurn => StatusCode::BAD_REQUEST,
            NotFound(_) => StatusCode::NOT_FOUND,
            Forbidden(_) => StatusCode::FORBIDDEN,
            Conflict(_) => StatusCode::CONFLICT,
            Storage(e) => {
                error!("storage failure: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "internal error".to_string(),
            _ => self.0.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Run blocking engine/store work off the async runtime.
pub async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> arena_engine::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("task join error: {}", e))?;
    Ok(result?)
}
