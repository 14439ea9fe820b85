pub mod bootstrap;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    middleware::from_fn,
};
use tower_http::cors::CorsLayer;

use crate::middleware::log_request;
use crate::state::AppState;

/// The complete HTTP application: `/api` routes, request logging and CORS.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::very_permissive().expose_headers([CONTENT_DISPOSITION, CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::routes(state))
        .layer(from_fn(log_request))
        .layer(cors)
}
