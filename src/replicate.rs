use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::GenerationError;

/// Status line and body of a provider response, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_upstream_error(self) -> GenerationError {
        GenerationError::Upstream { status: Some(self.status), body: self.body }
    }
}

/// Network seam for the prediction API. Implementations only move bytes;
/// they never decide what a status or body means.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn create_prediction(&self, token: &str, payload: &Value) -> Result<RawResponse, GenerationError>;
    async fn fetch_prediction(&self, token: &str, id: &str) -> Result<RawResponse, GenerationError>;
}

pub struct ReplicateClient {
    client: Client,
    predictions_url: String,
}

impl ReplicateClient {
    /// Every request is bounded by `request_timeout` so a stalled provider
    /// socket surfaces as an upstream error instead of hanging the poll loop.
    pub fn new(predictions_url: impl Into<String>, request_timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GenerationError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            predictions_url: predictions_url.into(),
        })
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, GenerationError> {
        let status = response.status();
        let body = response.text().await.map_err(GenerationError::transport)?;
        if !status.is_success() {
            error!("❌ Provider returned {}: {}", status, truncate(&body, 500));
        } else {
            debug!("📥 Provider response: {}", truncate(&body, 1000));
        }
        Ok(RawResponse { status: status.as_u16(), body })
    }
}

#[async_trait]
impl Transport for ReplicateClient {
    async fn create_prediction(&self, token: &str, payload: &Value) -> Result<RawResponse, GenerationError> {
        info!("🔗 POST {}", self.predictions_url);
        let response = self.client
            .post(&self.predictions_url)
            .header("Authorization", format!("Token {token}"))
            .json(payload)
            .send()
            .await
            .map_err(GenerationError::transport)?;
        Self::read(response).await
    }

    async fn fetch_prediction(&self, token: &str, id: &str) -> Result<RawResponse, GenerationError> {
        let url = format!("{}/{}", self.predictions_url, id);
        let response = self.client
            .get(&url)
            .header("Authorization", format!("Token {token}"))
            .send()
            .await
            .map_err(GenerationError::transport)?;
        Self::read(response).await
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[{} bytes total]", &s[..idx], s.len()),
        None => s.to_string(),
    }
}
