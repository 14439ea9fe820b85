use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use util::validation::format_validation_errors;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::routes::common::json_rejection;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct BreakRequest {
    #[validate(required(message = "user_id is required"))]
    pub user_id: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

fn validated(body: Result<Json<BreakRequest>, JsonRejection>) -> ApiResult<(i64, Option<f64>, Option<f64>)> {
    let Json(req) = body.map_err(json_rejection)?;
    req.validate()
        .map_err(|e| ApiError::bad_request(format_validation_errors(&e)))?;
    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::bad_request("user_id is required"))?;
    Ok((user_id, req.lat, req.lng))
}

/// POST /api/istirahat/start
///
/// ```json
/// { "user_id": 7, "lat": -8.6705, "lng": 115.2126 }
/// ```
///
/// `lat` and `lng` may both be omitted; the break is then recorded without a position.
/// Sending only one of them is a `400`.
///
/// ### Responses
/// - `200 OK` with the new break id
/// - `403` outside the shift's break window (`window_start`, `window_end` in `data`)
/// - `404` no check-in today
/// - `409` already on a break, or already checked out
pub async fn start_break(
    State(state): State<AppState>,
    body: Result<Json<BreakRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let (user_id, lat, lng) = validated(body)?;
    let started = state.protocol().break_start(user_id, lat, lng).await?;
    Ok(Json(ApiResponse::success(started, "Break started")))
}

/// POST /api/istirahat/end
///
/// Same body as `start`, with the same optional `lat`/`lng` pair.
///
/// ### Responses
/// - `200 OK` with the duration and whether the daily limit was exceeded
/// - `404` no check-in today, or no break in progress
pub async fn end_break(
    State(state): State<AppState>,
    body: Result<Json<BreakRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let (user_id, lat, lng) = validated(body)?;
    let ended = state.protocol().break_end(user_id, lat, lng).await?;
    Ok(Json(ApiResponse::success(ended, "Break ended")))
}
