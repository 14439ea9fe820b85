//! `/face`: reference enrollment and ad-hoc verification.
//!
//! - `POST /enroll` (multipart) → store baselines and the mean embedding
//! - `POST /verify` (multipart) → match decision and score
//! - `GET /{user_id}/baselines` → baseline images with signed URLs

use axum::{
    Router,
    routing::{get, post},
};
use get::list_baselines;
use post::{enroll, verify};

use crate::state::AppState;

pub mod get;
pub mod post;

pub fn face_routes() -> Router<AppState> {
    Router::new()
        .route("/enroll", post(enroll))
        .route("/verify", post(verify))
        .route("/{user_id}/baselines", get(list_baselines))
}
