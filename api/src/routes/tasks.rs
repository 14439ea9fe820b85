use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

/// `/tasks/{id}`: poll a deferred check-in/check-out by the id returned with `202`.
pub fn tasks_routes() -> Router<AppState> {
    Router::new().route("/{task_id}", get(get_task))
}

/// GET /api/tasks/{task_id}
///
/// Returns kind, status (`queued`, `running`, `succeeded`, `rejected`, `failed`),
/// attempts, the last error and the worker's result.
pub async fn get_task(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let task = state.protocol().task(&task_id).await?;
    Ok(Json(ApiResponse::success(task, "Task retrieved")))
}
