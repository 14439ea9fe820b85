use axum::{
    Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use services::storage::{ObjectStore, StorageError};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `/storage/{*path}`: serves objects of the local backend through signed links.
pub fn storage_routes() -> Router<AppState> {
    Router::new().route("/{*path}", get(download_object))
}

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// GET /api/storage/{*path}?expires=&signature=
///
/// Only exists for the local backend. Missing, expired or tampered signatures get `403`.
pub async fn download_object(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(q): Query<SignedQuery>,
) -> ApiResult<impl IntoResponse> {
    let Some(local) = state.storage().local.as_ref() else {
        return Err(ApiError::not_found("NOT_FOUND", "Object storage is not served by this API"));
    };

    let (Some(expires), Some(signature)) = (q.expires, q.signature.as_deref()) else {
        return Err(ApiError::forbidden("INVALID_SIGNATURE", "Missing signature"));
    };
    if !local.verify_signature(&path, expires, signature) {
        return Err(ApiError::forbidden("INVALID_SIGNATURE", "Invalid or expired signature"));
    }

    let bytes = match local.download(&path).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => {
            return Err(ApiError::not_found("NOT_FOUND", "Object not found"));
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to read stored object");
            return Err(ApiError::internal("Failed to read object"));
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes))
}
