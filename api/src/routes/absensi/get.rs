use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::common::parse_required;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

/// GET /api/absensi/status?user_id=
///
/// Read-only. `state` is `NONE`, `CHECKED_IN` or `CHECKED_OUT`; `latest_task`
/// shows whether the most recent deferred write succeeded, was rejected or failed.
pub async fn status(State(state): State<AppState>, Query(q): Query<UserQuery>) -> ApiResult<impl IntoResponse> {
    let user_id = parse_required(q.user_id.as_deref(), "user_id")?;
    let status = state.protocol().status(user_id).await?;
    Ok(Json(ApiResponse::success(status, "Attendance status retrieved")))
}
