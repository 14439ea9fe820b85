use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/face/{user_id}/baselines
///
/// Baseline images with signed URLs valid for `SIGNED_URL_EXPIRES` seconds. An
/// unenrolled user yields an empty list.
pub async fn list_baselines(State(state): State<AppState>, Path(user_id): Path<i64>) -> ApiResult<impl IntoResponse> {
    let baselines = state
        .face()
        .baselines(user_id, state.settings().signed_url_ttl)
        .await?;
    Ok(Json(ApiResponse::success(baselines, "Baselines retrieved")))
}
