//! Object storage for face baselines and embeddings.
//!
//! Two backends: [`LocalObjectStore`] (filesystem + HMAC-signed URLs served by the API)
//! and [`SupabaseStorage`] (Supabase Storage REST API).

mod local;
mod supabase;

pub use local::LocalObjectStore;
pub use supabase::SupabaseStorage;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// One listed object. `path` is the full key, `name` the last segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub name: String,
    pub path: String,
    pub size: Option<u64>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend identifier reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Objects directly under `prefix`, sorted by name.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Rejects keys that could escape the storage root.
pub(crate) fn validate_key(path: &str) -> Result<&str, StorageError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty()
        || trimmed.contains('\\')
        || trimmed.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(StorageError::InvalidPath(path.to_owned()));
    }
    Ok(trimmed)
}
