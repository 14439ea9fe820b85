//! HTTP error mapping.
//!
//! Handlers return [`ApiResult`]; every failure leaves through [`ApiError`] so the
//! status, the envelope and the `code` stay consistent across routes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::{Map, Value, json};
use services::error::AttendanceError;
use services::face::FaceError;

use crate::response::ApiResponse;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Map<String, Value>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_owned(), value.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

fn status_for(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::InvalidInput(_)
        | AttendanceError::OutsideGeofence { .. }
        | AttendanceError::FaceMismatch { .. }
        | AttendanceError::FaceVerificationFailed(_) => StatusCode::BAD_REQUEST,
        AttendanceError::LocationNotFound(_)
        | AttendanceError::UserNotFound(_)
        | AttendanceError::NotCheckedIn
        | AttendanceError::NoActiveBreak
        | AttendanceError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        AttendanceError::DuplicateCheckin
        | AttendanceError::CheckinInProgress { .. }
        | AttendanceError::CheckoutInProgress { .. }
        | AttendanceError::AlreadyCheckedOut
        | AttendanceError::AlreadyOnBreak => StatusCode::CONFLICT,
        AttendanceError::OutsideBreakWindow { .. } => StatusCode::FORBIDDEN,
        AttendanceError::Database(_) | AttendanceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
            return ApiError::internal("Internal server error");
        }

        let base = ApiError::new(status, err.code(), err.to_string());
        match err {
            AttendanceError::OutsideGeofence { distance_m, radius_m } => {
                base.with("distance_m", distance_m).with("radius_m", radius_m)
            }
            AttendanceError::FaceMismatch { score, threshold } => {
                base.with("score", score).with("threshold", threshold)
            }
            AttendanceError::OutsideBreakWindow { start, end } => base
                .with("window_start", start.format("%H:%M").to_string())
                .with("window_end", end.format("%H:%M").to_string()),
            AttendanceError::CheckinInProgress { task_id } | AttendanceError::CheckoutInProgress { task_id } => {
                base.with("task_id", task_id)
            }
            _ => base,
        }
    }
}

impl From<FaceError> for ApiError {
    fn from(err: FaceError) -> Self {
        AttendanceError::from(err).into()
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        AttendanceError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut data = self.details;
        data.insert("code".to_owned(), json!(self.code));
        (
            self.status,
            Json(ApiResponse::failure(Value::Object(data), self.message)),
        )
            .into_response()
    }
}
