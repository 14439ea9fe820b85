//! Deterministic stand-ins for the external capabilities, shared by unit and HTTP tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Mutex;

use crate::face::{FaceEmbedder, FaceError};
use crate::notification::{PushClient, PushError, PushMessage, TokenResult};

const STUB_DIM: usize = 256;

/// Fake face engine.
///
/// An image whose bytes start with `face:` is treated as a face; the rest of the
/// bytes name the person. The same name always yields the same ±1 vector, different
/// names yield nearly orthogonal ones. Any other image has no face.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubEmbedder;

impl StubEmbedder {
    pub fn image_of(name: &str) -> Vec<u8> {
        format!("face:{name}").into_bytes()
    }

    fn vector_for(identity: &[u8]) -> Vec<f32> {
        let mut bits = Vec::with_capacity(STUB_DIM);
        let mut block = 0u32;
        while bits.len() < STUB_DIM {
            let mut hasher = Sha256::new();
            hasher.update(identity);
            hasher.update(block.to_le_bytes());
            for byte in hasher.finalize() {
                for shift in 0..8 {
                    bits.push(if (byte >> shift) & 1 == 1 { 1.0 } else { -1.0 });
                }
            }
            block += 1;
        }
        bits.truncate(STUB_DIM);
        bits
    }
}

#[async_trait]
impl FaceEmbedder for StubEmbedder {
    async fn embed(&self, image: &[u8]) -> Result<Option<Vec<f32>>, FaceError> {
        match image.strip_prefix(b"face:") {
            Some(identity) => Ok(Some(Self::vector_for(identity))),
            None => Ok(None),
        }
    }
}

/// Push client that remembers every send. Tokens marked failing report an error.
#[derive(Debug, Default)]
pub struct RecordingPushClient {
    sent: Mutex<Vec<(Vec<String>, PushMessage)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingPushClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_token(&self, token: &str) {
        self.failing.lock().unwrap().insert(token.to_owned());
    }

    pub fn sent(&self) -> Vec<(Vec<String>, PushMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, m)| m.title).collect()
    }
}

#[async_trait]
impl PushClient for RecordingPushClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<Vec<TokenResult>, PushError> {
        self.sent.lock().unwrap().push((tokens.to_vec(), message.clone()));
        let failing = self.failing.lock().unwrap();
        Ok(tokens
            .iter()
            .map(|t| TokenResult {
                token: t.clone(),
                error: failing.contains(t).then(|| "NotRegistered".to_owned()),
            })
            .collect())
    }
}
