//! `/istirahat`: break sessions within today's attendance record.
//!
//! - `POST /start` → open a break
//! - `POST /end` → close the open break
//! - `GET /status?user_id=` → open break, sessions today, total seconds

use axum::{
    Router,
    routing::{get, post},
};
use get::break_status;
use post::{end_break, start_break};

use crate::state::AppState;

pub mod get;
pub mod post;

pub fn istirahat_routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_break))
        .route("/end", post(end_break))
        .route("/status", get(break_status))
}
