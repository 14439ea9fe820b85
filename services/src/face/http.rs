use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{FaceEmbedder, FaceError};

/// Calls an external embedding service: `POST <url>` with the raw image bytes,
/// answered by `{"embedding": [f32, ...] | null}`.
pub struct HttpFaceEmbedder {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<Vec<f32>>,
}

impl HttpFaceEmbedder {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FaceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaceError::Engine(e.to_string()))?;
        Ok(Self {
            client,
            url: url.trim().to_owned(),
        })
    }
}

#[async_trait]
impl FaceEmbedder for HttpFaceEmbedder {
    async fn embed(&self, image: &[u8]) -> Result<Option<Vec<f32>>, FaceError> {
        if self.url.is_empty() {
            return Err(FaceError::Engine("FACE_EMBEDDER_URL is not configured".into()));
        }

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| FaceError::Engine(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FaceError::Engine(format!("embedder returned {status}: {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| FaceError::Engine(format!("error decoding embedder response: {e}")))?;

        match parsed.embedding {
            Some(v) if v.is_empty() => Ok(None),
            other => Ok(other),
        }
    }
}
