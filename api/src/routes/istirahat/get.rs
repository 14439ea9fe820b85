use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::absensi::get::UserQuery;
use crate::routes::common::parse_required;
use crate::state::AppState;

/// GET /api/istirahat/status?user_id=
pub async fn break_status(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_required(q.user_id.as_deref(), "user_id")?;
    let status = state.protocol().break_status(user_id).await?;
    Ok(Json(ApiResponse::success(status, "Break status retrieved")))
}
