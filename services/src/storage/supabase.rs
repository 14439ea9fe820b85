use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ObjectInfo, ObjectStore, StorageError, validate_key};

/// Supabase Storage over its REST API, authenticated with the service-role key.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
    #[serde(default)]
    metadata: Option<ListedMetadata>,
}

#[derive(Deserialize)]
struct ListedMetadata {
    size: Option<u64>,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: &str, bucket: &str) -> Result<Self, StorageError> {
        if base_url.trim().is_empty() || service_key.trim().is_empty() {
            return Err(StorageError::Backend(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must be set".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_key: service_key.to_owned(),
            bucket: bucket.to_owned(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    async fn check(resp: reqwest::Response, path: &str) -> Result<reqwest::Response, StorageError> {
        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_owned())),
            // Supabase reports missing objects as 400 with an error body on some routes.
            StatusCode::BAD_REQUEST => {
                let body = resp.text().await.unwrap_or_default();
                if body.contains("not_found") || body.contains("Object not found") {
                    Err(StorageError::NotFound(path.to_owned()))
                } else {
                    Err(StorageError::Backend(format!("400: {body}")))
                }
            }
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(StorageError::Backend(format!("{s}: {body}")))
            }
        }
    }
}

fn backend_err(e: reqwest::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let path = validate_key(path)?;
        let resp = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(backend_err)?;
        Self::check(resp, path).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = validate_key(path)?;
        let resp = self
            .client
            .get(self.object_url(path))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(backend_err)?;
        let resp = Self::check(resp, path).await?;
        Ok(resp.bytes().await.map_err(backend_err)?.to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let prefix = validate_key(prefix)?;
        let resp = self
            .client
            .post(format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket))
            .bearer_auth(&self.service_key)
            .json(&json!({
                "prefix": prefix,
                "limit": 1000,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" },
            }))
            .send()
            .await
            .map_err(backend_err)?;
        let resp = Self::check(resp, prefix).await?;
        let listed: Vec<ListedObject> = resp.json().await.map_err(backend_err)?;

        Ok(listed
            .into_iter()
            // Folders come back without metadata.
            .filter(|o| o.metadata.is_some())
            .map(|o| ObjectInfo {
                path: format!("{prefix}/{}", o.name),
                size: o.metadata.and_then(|m| m.size),
                name: o.name,
            })
            .collect())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let path = validate_key(path)?;
        let resp = self
            .client
            .post(format!(
                "{}/storage/v1/object/sign/{}/{}",
                self.base_url, self.bucket, path
            ))
            .bearer_auth(&self.service_key)
            .json(&json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await
            .map_err(backend_err)?;
        let resp = Self::check(resp, path).await?;
        let signed: SignedUrlResponse = resp.json().await.map_err(backend_err)?;
        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_credentials() {
        assert!(SupabaseStorage::new("", "key", "e-hrm").is_err());
        assert!(SupabaseStorage::new("https://x.supabase.co", "", "e-hrm").is_err());
        let s = SupabaseStorage::new("https://x.supabase.co/", "key", "e-hrm").unwrap();
        assert_eq!(
            s.object_url("face_detection/1/embedding.json"),
            "https://x.supabase.co/storage/v1/object/e-hrm/face_detection/1/embedding.json"
        );
    }
}
