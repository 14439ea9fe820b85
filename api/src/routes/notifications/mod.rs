//! `/notifications`: push device registration.

use axum::{Router, routing::post};
use post::register_device;

use crate::state::AppState;

pub mod post;

pub fn notifications_routes() -> Router<AppState> {
    Router::new().route("/", post(register_device))
}
