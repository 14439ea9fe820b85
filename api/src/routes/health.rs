use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

/// Builds the `/health` route group.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub storage: &'static str,
    pub push_configured: bool,
}

/// GET /health
///
/// ```json
/// {
///   "success": true,
///   "data": { "status": "OK", "storage": "local", "push_configured": false },
///   "message": "Health check passed"
/// }
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(
        Health {
            status: "OK",
            storage: state.storage().store.backend(),
            push_configured: state.notifier().push_configured(),
        },
        "Health check passed",
    ))
}
