use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push transport error: {0}")]
    Transport(String),

    #[error("push provider rejected the request ({status}): {body}")]
    Provider { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// Delivery outcome for one device token. `error` is `None` on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResult {
    pub token: String,
    pub error: Option<String>,
}

/// Sends one message to many device tokens.
#[async_trait]
pub trait PushClient: Send + Sync {
    /// False when the client has no credentials and drops every message.
    fn is_configured(&self) -> bool;

    /// Per-token results, in the order of `tokens`.
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<Vec<TokenResult>, PushError>;
}

/// Firebase Cloud Messaging over the HTTP endpoint keyed by a server key.
pub struct FcmPushClient {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

#[derive(Serialize)]
struct FcmRequest<'a> {
    registration_ids: &'a [String],
    notification: FcmNotification<'a>,
    data: &'a BTreeMap<String, String>,
    priority: &'static str,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    sound: &'static str,
}

#[derive(Deserialize)]
struct FcmResponse {
    #[serde(default)]
    results: Vec<FcmResult>,
}

#[derive(Deserialize)]
struct FcmResult {
    #[serde(default)]
    error: Option<String>,
}

impl FcmPushClient {
    pub fn new(endpoint: &str, server_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.to_owned(),
            server_key: server_key.to_owned(),
        }
    }
}

#[async_trait]
impl PushClient for FcmPushClient {
    fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.server_key.is_empty()
    }

    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<Vec<TokenResult>, PushError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let body = FcmRequest {
            registration_ids: tokens,
            notification: FcmNotification {
                title: &message.title,
                body: &message.body,
                sound: "default",
            },
            data: &message.data,
            priority: "high",
        };

        let res = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PushError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: FcmResponse = res
            .json()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        Ok(tokens
            .iter()
            .enumerate()
            .map(|(i, token)| TokenResult {
                token: token.clone(),
                error: match parsed.results.get(i) {
                    Some(r) => r.error.clone(),
                    None => Some("missing result".into()),
                },
            })
            .collect())
    }
}

/// Used when no push credentials are configured. Messages are only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPushClient;

#[async_trait]
impl PushClient for NoopPushClient {
    fn is_configured(&self) -> bool {
        false
    }

    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<Vec<TokenResult>, PushError> {
        tracing::debug!(tokens = tokens.len(), title = %message.title, "push disabled, message dropped");
        Ok(Vec::new())
    }
}
