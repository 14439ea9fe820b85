//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness plus storage/push configuration
//! - `/absensi` → check-in, check-out, daily status
//! - `/istirahat` → break start/end/status
//! - `/tasks` → deferred task polling
//! - `/location` → office locations
//! - `/face` → face enrollment and verification
//! - `/notifications` → push device registration
//! - `/storage` → signed downloads from the local object store

use axum::{Router, extract::DefaultBodyLimit};

use crate::routes::{
    absensi::absensi_routes, face::face_routes, health::health_routes, istirahat::istirahat_routes,
    location::location_routes, notifications::notifications_routes, storage::storage_routes,
    tasks::tasks_routes,
};
use crate::state::AppState;

pub mod absensi;
pub mod common;
pub mod face;
pub mod health;
pub mod istirahat;
pub mod location;
pub mod notifications;
pub mod storage;
pub mod tasks;

/// Builds the router mounted under `/api`, with its state applied.
pub fn routes(app_state: AppState) -> Router {
    let body_limit = app_state.settings().max_upload_bytes;

    Router::new()
        .nest("/health", health_routes())
        .nest("/absensi", absensi_routes())
        .nest("/istirahat", istirahat_routes())
        .nest("/tasks", tasks_routes())
        .nest("/location", location_routes())
        .nest("/face", face_routes())
        .nest("/notifications", notifications_routes())
        .nest("/storage", storage_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}
