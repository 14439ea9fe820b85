use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use db::models::device::{self, DeviceInfo};
use db::models::user;
use serde::Deserialize;
use util::validation::format_validation_errors;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::routes::common::json_rejection;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    #[validate(required(message = "user_id is required"))]
    pub user_id: Option<i64>,

    #[validate(length(min = 1, message = "token is required"))]
    #[serde(default)]
    pub token: String,

    #[serde(flatten)]
    pub device: DeviceInfo,
}

/// POST /api/notifications
///
/// ```json
/// { "user_id": 7, "token": "fcm-token", "platform": "android", "app_version": "1.4.0" }
/// ```
///
/// Registers the token for the user, or refreshes it: push is re-enabled and the
/// failure counter reset.
pub async fn register_device(
    State(state): State<AppState>,
    body: Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body.map_err(json_rejection)?;
    req.validate()
        .map_err(|e| ApiError::bad_request(format_validation_errors(&e)))?;
    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::bad_request("user_id is required"))?;
    let token = req.token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }

    if user::Model::find(state.db(), user_id).await?.is_none() {
        return Err(ApiError::not_found("USER_NOT_FOUND", format!("User {user_id} not found")));
    }

    let device = device::Model::upsert(state.db(), user_id, token, &req.device).await?;
    tracing::info!(user_id, device_id = device.id, "Push device registered");
    Ok(Json(ApiResponse::success(device, "Device registered")))
}
