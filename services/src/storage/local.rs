use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::PathBuf;
use std::time::Duration;

use super::{ObjectInfo, ObjectStore, StorageError, validate_key};

type HmacSha256 = Hmac<Sha256>;

/// Stores objects under a root directory. Signed URLs point at the API's
/// `/api/storage/{path}` route and carry an expiry plus an HMAC-SHA256 signature.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    secret: Vec<u8>,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, secret: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(validate_key(path)?))
    }

    fn mac(&self, path: &str, expires: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(format!("{path}:{expires}").as_bytes());
        mac
    }

    fn signature(&self, path: &str, expires: i64) -> String {
        hex::encode(self.mac(path, expires).finalize().into_bytes())
    }

    /// Checks a signature produced by [`ObjectStore::signed_url`]. Expired links fail.
    pub fn verify_signature(&self, path: &str, expires: i64, signature: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        let Ok(path) = validate_key(path) else {
            return false;
        };
        let Ok(given) = hex::decode(signature) else {
            return false;
        };
        self.mac(path, expires).verify_slice(&given).is_ok()
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let full = self.full_path(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.full_path(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(path.to_owned())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let prefix = validate_key(prefix)?;
        let dir = self.root.join(prefix);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            out.push(ObjectInfo {
                path: format!("{prefix}/{name}"),
                name,
                size: Some(meta.len()),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let path = validate_key(path)?;
        if !tokio::fs::try_exists(self.root.join(path)).await? {
            return Err(StorageError::NotFound(path.to_owned()));
        }
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        let sig = self.signature(path, expires);
        Ok(format!(
            "{}/api/storage/{path}?expires={expires}&signature={sig}",
            self.public_base_url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn upload_list_download_and_sign() {
        let tmp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(tmp.path(), "http://localhost:3000/", "s3cret");

        store
            .upload("face_detection/7/baseline_2.jpg", b"two".to_vec(), "image/jpeg")
            .await
            .unwrap();
        store
            .upload("face_detection/7/baseline_1.jpg", b"one".to_vec(), "image/jpeg")
            .await
            .unwrap();

        let listed = store.list("face_detection/7").await.unwrap();
        let names: Vec<_> = listed.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["baseline_1.jpg", "baseline_2.jpg"]);
        assert_eq!(listed[0].path, "face_detection/7/baseline_1.jpg");

        assert_eq!(store.download(&listed[1].path).await.unwrap(), b"two");
        assert!(matches!(
            store.download("face_detection/7/missing.jpg").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(store.list("face_detection/8").await.unwrap().is_empty());

        let url = store
            .signed_url(&listed[0].path, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:3000/api/storage/face_detection/7/baseline_1.jpg?expires="));
        let query = url.split_once('?').unwrap().1;
        let mut expires = 0;
        let mut sig = "";
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("signature", v) => sig = v,
                _ => {}
            }
        }
        assert!(store.verify_signature(&listed[0].path, expires, sig));
        assert!(!store.verify_signature(&listed[1].path, expires, sig));
        assert!(!store.verify_signature(&listed[0].path, expires - 3600, sig));
    }
}
