use chrono::NaiveTime;
use sea_orm::DbErr;
use thiserror::Error;

use crate::face::FaceError;

/// Every way an attendance operation can be refused or fail.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Location {0} not found")]
    LocationNotFound(i64),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Outside the allowed area: {distance_m:.1} m from the location, radius is {radius_m:.0} m")]
    OutsideGeofence { distance_m: f64, radius_m: f64 },

    #[error("Face does not match (score {score:.3}, threshold {threshold:.3})")]
    FaceMismatch { score: f64, threshold: f64 },

    #[error("Face verification failed: {0}")]
    FaceVerificationFailed(String),

    #[error("No check-in recorded today")]
    NotCheckedIn,

    #[error("Already checked in today")]
    DuplicateCheckin,

    #[error("A check-in is already being processed")]
    CheckinInProgress { task_id: Option<String> },

    #[error("A check-out is already being processed")]
    CheckoutInProgress { task_id: Option<String> },

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("A break is already in progress")]
    AlreadyOnBreak,

    #[error("No active break")]
    NoActiveBreak,

    #[error(
        "Breaks are only allowed between {from} and {until}",
        from = .start.format("%H:%M"),
        until = .end.format("%H:%M")
    )]
    OutsideBreakWindow { start: NaiveTime, end: NaiveTime },

    #[error("Task {0} not found")]
    TaskNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AttendanceError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::InvalidInput(_) => "INVALID_INPUT",
            AttendanceError::LocationNotFound(_) => "LOCATION_NOT_FOUND",
            AttendanceError::UserNotFound(_) => "USER_NOT_FOUND",
            AttendanceError::OutsideGeofence { .. } => "OUTSIDE_GEOFENCE",
            AttendanceError::FaceMismatch { .. } => "FACE_MISMATCH",
            AttendanceError::FaceVerificationFailed(_) => "FACE_VERIFICATION_FAILED",
            AttendanceError::NotCheckedIn => "NOT_CHECKED_IN",
            AttendanceError::DuplicateCheckin => "DUPLICATE_CHECKIN",
            AttendanceError::CheckinInProgress { .. } => "CHECKIN_IN_PROGRESS",
            AttendanceError::CheckoutInProgress { .. } => "CHECKOUT_IN_PROGRESS",
            AttendanceError::AlreadyCheckedOut => "ALREADY_CHECKED_OUT",
            AttendanceError::AlreadyOnBreak => "ALREADY_ON_BREAK",
            AttendanceError::NoActiveBreak => "NO_ACTIVE_BREAK",
            AttendanceError::OutsideBreakWindow { .. } => "OUTSIDE_BREAK_WINDOW",
            AttendanceError::TaskNotFound(_) => "TASK_NOT_FOUND",
            AttendanceError::Database(_) | AttendanceError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<FaceError> for AttendanceError {
    fn from(err: FaceError) -> Self {
        AttendanceError::FaceVerificationFailed(err.to_string())
    }
}
