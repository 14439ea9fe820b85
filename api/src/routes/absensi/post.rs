use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use services::attendance::AttendanceSubmission;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::common::FormData;
use crate::state::AppState;

/// Maps the multipart form onto a submission. Numeric fields are parsed here; the
/// protocol does the rest of the validation.
pub fn submission_from_form(form: &FormData) -> ApiResult<AttendanceSubmission> {
    Ok(AttendanceSubmission {
        user_id: form.parsed("user_id")?,
        location_id: form.parsed("location_id")?,
        lat: form.parsed("lat")?,
        lng: form.parsed("lng")?,
        image: form.file("image"),
        agenda_ids: form.all("agenda_kerja_id"),
        recipient_ids: form.all("recipient"),
        note_descriptions: form.all("deskripsi_catatan"),
        note_attachments: form.all("lampiran_url"),
    })
}

/// POST /api/absensi/checkin
///
/// Verifies location and face synchronously, then queues the write.
///
/// ### Form fields
/// `user_id`, `lat`, `lng`, `image` (file), optional `location_id`, repeated
/// `agenda_kerja_id`, `recipient`, `deskripsi_catatan` and `lampiran_url`.
///
/// ### Responses
/// - `202 Accepted` with `task_id`, distance and face score
/// - `400` invalid input, outside the geofence, or face not matched
/// - `404` unknown location or user
/// - `409` already checked in, or a check-in is already queued
pub async fn checkin(State(state): State<AppState>, multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let form = FormData::read(multipart).await?;
    let accepted = state.protocol().checkin(submission_from_form(&form)?).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(accepted, "Check-in accepted and is being processed")),
    ))
}

/// POST /api/absensi/checkout
///
/// Same form as check-in. Notes sent here replace the check-in notes by position;
/// sending none keeps them.
///
/// ### Responses
/// - `202 Accepted` with `task_id`
/// - `404` no check-in today
/// - `409` already checked out, or a check-in/check-out is still queued
pub async fn checkout(State(state): State<AppState>, multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let form = FormData::read(multipart).await?;
    let accepted = state.protocol().checkout(submission_from_form(&form)?).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(accepted, "Check-out accepted and is being processed")),
    ))
}
