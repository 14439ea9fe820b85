//! Face verification: an opaque embedding capability plus similarity scoring.

mod http;
mod verifier;

pub use http::HttpFaceEmbedder;
pub use verifier::{Baseline, Enrollment, FaceMatch, FaceVerifier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("no face reference enrolled for this user")]
    NoReferenceEnrolled,

    #[error("no face detected in the image")]
    NoFaceDetected,

    #[error("face engine timed out after {0}s")]
    Timeout(u64),

    #[error("face engine error: {0}")]
    Engine(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Turns an image into a face embedding.
#[async_trait]
pub trait FaceEmbedder: Send + Sync {
    /// `Ok(None)` means the engine ran but found no face.
    async fn embed(&self, image: &[u8]) -> Result<Option<Vec<f32>>, FaceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Dot product of unit vectors; higher is more similar.
    Cosine,
    /// Negated euclidean distance; higher (closer to zero) is more similar.
    L2,
}

impl Metric {
    pub fn default_threshold(self) -> f64 {
        match self {
            Metric::Cosine => 0.45,
            Metric::L2 => 1.4,
        }
    }

    pub fn score(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Metric::Cosine => a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum(),
            Metric::L2 => -a
                .iter()
                .zip(b)
                .map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2))
                .sum::<f64>()
                .sqrt(),
        }
    }

    pub fn is_match(self, score: f64, threshold: f64) -> bool {
        match self {
            Metric::Cosine => score >= threshold,
            Metric::L2 => score >= -threshold,
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "l2" => Ok(Metric::L2),
            other => Err(format!("unsupported face metric: {other}")),
        }
    }
}

/// Scales to unit length. The epsilon keeps an all-zero vector finite.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt() + 1e-10;
    v.iter().map(|x| x / norm).collect()
}

/// Normalized mean of already-normalized embeddings. `None` for an empty or ragged set.
pub fn mean_embedding(embeddings: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = embeddings.first()?;
    let dim = first.len();
    if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
        return None;
    }
    let mut sum = vec![0f32; dim];
    for e in embeddings {
        for (acc, x) in sum.iter_mut().zip(e) {
            *acc += x;
        }
    }
    let n = embeddings.len() as f32;
    let mean: Vec<f32> = sum.into_iter().map(|x| x / n).collect();
    Some(normalize(&mean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_unit_vectors_is_one() {
        let v = normalize(&[3.0, 4.0]);
        let s = Metric::Cosine.score(&v, &v);
        assert!((s - 1.0).abs() < 1e-6);
        assert!(Metric::Cosine.is_match(s, 0.45));
    }

    #[test]
    fn orthogonal_vectors_do_not_match() {
        let s = Metric::Cosine.score(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(s.abs() < 1e-9);
        assert!(!Metric::Cosine.is_match(s, 0.45));

        let d = Metric::L2.score(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d + 2f64.sqrt()).abs() < 1e-6);
        assert!(!Metric::L2.is_match(d, 1.0));
        assert!(Metric::L2.is_match(d, 1.5));
    }

    #[test]
    fn mean_embedding_is_unit_length() {
        let m = mean_embedding(&[normalize(&[1.0, 0.0]), normalize(&[0.0, 1.0])]).unwrap();
        let len: f32 = m.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((len - 1.0).abs() < 1e-5);
        assert!(mean_embedding(&[vec![1.0], vec![1.0, 2.0]]).is_none());
        assert!(mean_embedding(&[]).is_none());
    }

    #[test]
    fn parses_metric_names() {
        assert_eq!("Cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("l2".parse::<Metric>().unwrap(), Metric::L2);
        assert!("manhattan".parse::<Metric>().is_err());
    }
}
