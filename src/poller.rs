use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::GenerationError;
use crate::models::{Job, JobId, JobStatus};
use crate::replicate::Transport;

/// Timed suspension between poll attempts. Swapped for a recorder in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5), max_attempts: 60 }
    }
}

pub struct Poller {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    api_token: Option<String>,
    policy: PollPolicy,
}

impl Poller {
    pub fn new(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        api_token: Option<String>,
        policy: PollPolicy,
    ) -> Self {
        Self { transport, sleeper, api_token, policy }
    }

    /// Waits for the prediction to reach a terminal state and returns the
    /// first output URL.
    pub async fn await_result(&self, job_id: &JobId) -> Result<String, GenerationError> {
        let token = self.api_token.as_deref().ok_or_else(|| {
            GenerationError::Configuration("REPLICATE_API_TOKEN is not set".into())
        })?;
        let max = self.policy.max_attempts;

        for attempt in 1..=max {
            let job = self.fetch(token, job_id).await?;
            info!("⏳ Poll {}/{} for {}: {:?}", attempt, max, job_id, job.status);

            match job.status {
                JobStatus::Succeeded => return first_output_url(&job),
                JobStatus::Failed => {
                    let detail = job.error_detail.unwrap_or_else(|| "Unknown error".to_string());
                    error!("❌ Prediction {} failed: {}", job_id, detail);
                    return Err(GenerationError::GenerationFailed(detail));
                }
                JobStatus::Pending | JobStatus::Processing => {
                    if attempt < max {
                        self.sleeper.sleep(self.policy.interval).await;
                    }
                }
            }
        }

        warn!("⌛ Prediction {} still running after {} attempts", job_id, max);
        Err(GenerationError::Timeout { attempts: max })
    }

    async fn fetch(&self, token: &str, job_id: &JobId) -> Result<Job, GenerationError> {
        let response = self.transport.fetch_prediction(token, job_id).await?;
        if !response.is_success() {
            return Err(response.into_upstream_error());
        }
        parse_snapshot(job_id, &response.body)
    }
}

#[derive(Debug, Deserialize)]
struct PredictionSnapshot {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
}

fn parse_snapshot(job_id: &JobId, body: &str) -> Result<Job, GenerationError> {
    let snapshot: PredictionSnapshot = serde_json::from_str(body)
        .map_err(|e| GenerationError::Protocol(format!("unreadable prediction snapshot: {e}")))?;

    let status = JobStatus::from_provider(&snapshot.status)
        .ok_or_else(|| GenerationError::Protocol(format!("unknown prediction status '{}'", snapshot.status)))?;

    // Non-string entries keep their slot so the first element stays the canonical one.
    let output_urls = match snapshot.output {
        Value::Array(items) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let error_detail = match snapshot.error {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    };

    Ok(Job {
        id: snapshot.id.unwrap_or_else(|| job_id.clone()),
        status,
        output_urls,
        error_detail,
    })
}

fn first_output_url(job: &Job) -> Result<String, GenerationError> {
    let first = job.output_urls.first().ok_or_else(|| {
        error!("❌ Prediction {} succeeded without output", job.id);
        GenerationError::Protocol("prediction succeeded without any output".into())
    })?;

    match Url::parse(first) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
            info!("✅ Prediction {} succeeded: {}", job.id, first);
            Ok(first.clone())
        }
        _ => Err(GenerationError::Protocol(format!("invalid image URL returned: {first}"))),
    }
}
