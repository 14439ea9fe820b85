//! `/location`: office locations used for geofencing.

use axum::{Router, routing::get};
use get::{get_location, list_locations, my_location, nearest_locations};

use crate::state::AppState;

pub mod get;

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_locations))
        .route("/nearest", get(nearest_locations))
        .route("/my", get(my_location))
        .route("/{location_id}", get(get_location))
}
