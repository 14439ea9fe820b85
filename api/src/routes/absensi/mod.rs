//! `/absensi`: daily check-in, check-out and status.
//!
//! - `POST /checkin` (multipart) → `202 Accepted` with the task id
//! - `POST /checkout` (multipart) → `202 Accepted` with the task id
//! - `GET /status?user_id=` → today's state and the latest deferred task

use axum::{
    Router,
    routing::{get, post},
};
use get::status;
use post::{checkin, checkout};

use crate::state::AppState;

pub mod get;
pub mod post;

pub fn absensi_routes() -> Router<AppState> {
    Router::new()
        .route("/checkin", post(checkin))
        .route("/checkout", post(checkout))
        .route("/status", get(status))
}
