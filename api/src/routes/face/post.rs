use axum::{
    Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use db::models::device::{self, DeviceInfo};
use db::models::user;
use serde::Serialize;
use services::face::Enrollment;
use services::notification::events;
use std::collections::BTreeMap;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::routes::common::FormData;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub device_id: Option<i64>,
}

async fn existing_user(state: &AppState, user_id: i64) -> ApiResult<user::Model> {
    user::Model::find(state.db(), user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", format!("User {user_id} not found")))
}

fn device_info(form: &FormData) -> DeviceInfo {
    let field = |name: &str| form.text(name).map(str::to_owned);
    DeviceInfo {
        device_identifier: field("device_identifier"),
        device_label: field("device_label"),
        platform: field("platform"),
        os_version: field("os_version"),
        app_version: field("app_version"),
    }
}

/// POST /api/face/enroll
///
/// ### Form fields
/// `user_id`, repeated `images` (files), optional `push_token` with device metadata
/// (`device_identifier`, `device_label`, `platform`, `os_version`, `app_version`).
///
/// Images without a detectable face are skipped. If none remain the request fails
/// with `400 FACE_VERIFICATION_FAILED` and nothing is stored.
pub async fn enroll(State(state): State<AppState>, multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let form = FormData::read(multipart).await?;
    let user_id: i64 = form.required("user_id")?;
    let images = form.files("images");
    if images.is_empty() {
        return Err(ApiError::bad_request("at least one image is required"));
    }
    let user = existing_user(&state, user_id).await?;

    let enrollment = state.face().enroll(user_id, images).await?;

    let device_id = match form.text("push_token") {
        Some(token) => Some(device::Model::upsert(state.db(), user_id, token, &device_info(&form)).await?.id),
        None => None,
    };

    let mut data = BTreeMap::new();
    data.insert("employee_name".to_owned(), user.name);
    state
        .notifier()
        .send(user_id, events::FACE_REGISTRATION_SUCCESS, &data)
        .await;

    tracing::info!(
        user_id,
        images = enrollment.images_count,
        skipped = enrollment.skipped,
        "Face enrolled"
    );
    Ok(Json(ApiResponse::success(
        EnrollResponse { enrollment, device_id },
        "Face enrolled successfully",
    )))
}

/// POST /api/face/verify
///
/// ### Form fields
/// `user_id`, `image` (file)
///
/// Answers `200` whether or not the face matched; `data.match` carries the decision.
pub async fn verify(State(state): State<AppState>, multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let form = FormData::read(multipart).await?;
    let user_id: i64 = form.required("user_id")?;
    let image = form
        .file("image")
        .ok_or_else(|| ApiError::bad_request("image is required"))?;
    existing_user(&state, user_id).await?;

    let result = state.face().verify(user_id, &image).await?;
    let message = if result.matched {
        "Face matched"
    } else {
        "Face did not match"
    };
    Ok(Json(ApiResponse::success(result, message)))
}
