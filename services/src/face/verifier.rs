use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::{FaceEmbedder, FaceError, Metric, mean_embedding, normalize};
use crate::storage::{ObjectStore, StorageError};

/// Baselines averaged when no stored embedding exists.
const FALLBACK_BASELINES: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct FaceMatch {
    pub user_id: i64,
    pub metric: Metric,
    pub threshold: f64,
    pub score: f64,
    #[serde(rename = "match")]
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Enrollment {
    pub user_id: i64,
    pub images_count: usize,
    pub skipped: usize,
    pub embedding_path: String,
    pub baselines: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub name: String,
    pub path: String,
    pub url: String,
}

/// Verifies probe images against a user's enrolled reference.
///
/// References live in the object store under `face_detection/{user_id}/`:
/// `embedding.json` (normalized mean embedding) and `baseline_{ts}_{n}.jpg` images.
pub struct FaceVerifier {
    embedder: Arc<dyn FaceEmbedder>,
    store: Arc<dyn ObjectStore>,
    metric: Metric,
    threshold: f64,
    timeout: Duration,
}

fn user_root(user_id: i64) -> String {
    format!("face_detection/{user_id}")
}

fn embedding_key(user_id: i64) -> String {
    format!("{}/embedding.json", user_root(user_id))
}

impl FaceVerifier {
    pub fn new(
        embedder: Arc<dyn FaceEmbedder>,
        store: Arc<dyn ObjectStore>,
        metric: Metric,
        threshold: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            store,
            metric,
            threshold,
            timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Embeds one image within the configured timeout, normalized. `None` when no face.
    async fn embed(&self, image: &[u8]) -> Result<Option<Vec<f32>>, FaceError> {
        match tokio::time::timeout(self.timeout, self.embedder.embed(image)).await {
            Ok(res) => Ok(res?.map(|v| normalize(&v))),
            Err(_) => Err(FaceError::Timeout(self.timeout.as_secs())),
        }
    }

    pub async fn verify(&self, user_id: i64, probe: &[u8]) -> Result<FaceMatch, FaceError> {
        let probe = self.embed(probe).await?.ok_or(FaceError::NoFaceDetected)?;
        let reference = self.reference(user_id).await?;

        if reference.len() != probe.len() {
            return Err(FaceError::Engine(format!(
                "embedding dimension mismatch: reference {} vs probe {}",
                reference.len(),
                probe.len()
            )));
        }

        let score = self.metric.score(&reference, &probe);
        let matched = self.metric.is_match(score, self.threshold);
        tracing::debug!(user_id, score, matched, "face verification");

        Ok(FaceMatch {
            user_id,
            metric: self.metric,
            threshold: self.threshold,
            score,
            matched,
        })
    }

    async fn reference(&self, user_id: i64) -> Result<Vec<f32>, FaceError> {
        match self.store.download(&embedding_key(user_id)).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<f32>>(&bytes) {
                Ok(v) if !v.is_empty() => return Ok(normalize(&v)),
                _ => tracing::warn!(user_id, "stored face embedding is unreadable, using baselines"),
            },
            Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let baselines: Vec<_> = self
            .store
            .list(&user_root(user_id))
            .await?
            .into_iter()
            .filter(|o| o.name.starts_with("baseline_"))
            .take(FALLBACK_BASELINES)
            .collect();
        if baselines.is_empty() {
            return Err(FaceError::NoReferenceEnrolled);
        }

        let mut embeddings = Vec::with_capacity(baselines.len());
        for b in &baselines {
            let bytes = self.store.download(&b.path).await?;
            if let Some(e) = self.embed(&bytes).await? {
                embeddings.push(e);
            }
        }
        mean_embedding(&embeddings)
            .ok_or_else(|| FaceError::Engine("could not compute a reference from baselines".into()))
    }

    /// Stores baselines and the mean embedding for `user_id`.
    ///
    /// Images without a detectable face are skipped; if none remain the
    /// enrollment fails with [`FaceError::NoFaceDetected`] and nothing is written.
    pub async fn enroll(&self, user_id: i64, images: Vec<Vec<u8>>) -> Result<Enrollment, FaceError> {
        let mut accepted = Vec::new();
        let mut embeddings = Vec::new();
        let total = images.len();

        for (idx, image) in images.into_iter().enumerate() {
            match self.embed(&image).await? {
                Some(e) => {
                    embeddings.push(e);
                    accepted.push((idx + 1, image));
                }
                None => tracing::warn!(user_id, image = idx + 1, "no face detected, skipping"),
            }
        }

        let mean = mean_embedding(&embeddings).ok_or(FaceError::NoFaceDetected)?;

        let ts = Utc::now().timestamp();
        let mut baselines = Vec::with_capacity(accepted.len());
        for (idx, image) in accepted {
            let key = format!("{}/baseline_{ts}_{idx}.jpg", user_root(user_id));
            self.store.upload(&key, image, "image/jpeg").await?;
            baselines.push(key);
        }

        let key = embedding_key(user_id);
        let body = serde_json::to_vec(&mean).map_err(|e| FaceError::Engine(e.to_string()))?;
        self.store.upload(&key, body, "application/json").await?;
        tracing::info!(user_id, images = baselines.len(), "face enrolled");

        Ok(Enrollment {
            user_id,
            images_count: baselines.len(),
            skipped: total - baselines.len(),
            embedding_path: key,
            baselines,
        })
    }

    /// Baseline images of a user with short-lived signed URLs.
    pub async fn baselines(&self, user_id: i64, ttl: Duration) -> Result<Vec<Baseline>, FaceError> {
        let objects = self.store.list(&user_root(user_id)).await?;
        let mut out = Vec::new();
        for o in objects.into_iter().filter(|o| o.name.starts_with("baseline_")) {
            let url = self.store.signed_url(&o.path, ttl).await?;
            out.push(Baseline {
                name: o.name,
                path: o.path,
                url,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalObjectStore;
    use crate::test_utils::StubEmbedder;
    use tempfile::TempDir;

    fn verifier(tmp: &TempDir) -> (FaceVerifier, Arc<LocalObjectStore>) {
        let store = Arc::new(LocalObjectStore::new(tmp.path(), "http://localhost", "k"));
        let v = FaceVerifier::new(
            Arc::new(StubEmbedder),
            store.clone(),
            Metric::Cosine,
            0.45,
            Duration::from_secs(2),
        );
        (v, store)
    }

    #[tokio::test]
    async fn enroll_then_verify() {
        let tmp = TempDir::new().unwrap();
        let (v, _) = verifier(&tmp);

        let enrolled = v
            .enroll(7, vec![b"face:alice".to_vec(), b"noface".to_vec(), b"face:alice".to_vec()])
            .await
            .unwrap();
        assert_eq!(enrolled.images_count, 2);
        assert_eq!(enrolled.skipped, 1);
        assert_eq!(enrolled.embedding_path, "face_detection/7/embedding.json");

        let ok = v.verify(7, b"face:alice").await.unwrap();
        assert!(ok.matched);
        assert!(ok.score > 0.99);

        let other = v.verify(7, b"face:bob").await.unwrap();
        assert!(!other.matched);

        assert!(matches!(v.verify(7, b"noface").await, Err(FaceError::NoFaceDetected)));
        assert!(matches!(v.verify(8, b"face:alice").await, Err(FaceError::NoReferenceEnrolled)));
    }

    #[tokio::test]
    async fn falls_back_to_baselines_without_embedding() {
        let tmp = TempDir::new().unwrap();
        let (v, store) = verifier(&tmp);
        store
            .upload("face_detection/9/baseline_1_1.jpg", b"face:carol".to_vec(), "image/jpeg")
            .await
            .unwrap();

        let res = v.verify(9, b"face:carol").await.unwrap();
        assert!(res.matched);
    }

    #[tokio::test]
    async fn enrollment_without_any_face_fails() {
        let tmp = TempDir::new().unwrap();
        let (v, store) = verifier(&tmp);
        assert!(matches!(
            v.enroll(3, vec![b"noface".to_vec()]).await,
            Err(FaceError::NoFaceDetected)
        ));
        assert!(store.list("face_detection/3").await.unwrap().is_empty());
    }
}
