use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::GenerationError;
use crate::models::{GenerationRequest, JobId};
use crate::replicate::Transport;
use crate::style::apply_style;

pub const NEGATIVE_PROMPT: &str = "blurry, low quality, distorted, deformed, disfigured";

pub struct JobSubmitter {
    transport: Arc<dyn Transport>,
    api_token: Option<String>,
    model_version: String,
}

impl JobSubmitter {
    pub fn new(transport: Arc<dyn Transport>, api_token: Option<String>, model_version: String) -> Self {
        Self { transport, api_token, model_version }
    }

    pub fn build_payload(&self, request: &GenerationRequest) -> Value {
        json!({
            "version": self.model_version,
            "input": {
                "prompt": apply_style(&request.prompt, &request.preset_id),
                "negative_prompt": NEGATIVE_PROMPT,
                "width": request.width,
                "height": request.height,
                "num_outputs": request.sample_count,
                "guidance_scale": request.guidance_scale,
            }
        })
    }

    /// Creates the remote prediction and returns its id.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<JobId, GenerationError> {
        let token = self.api_token.as_deref().ok_or_else(|| {
            error!("Missing provider API token");
            GenerationError::Configuration("REPLICATE_API_TOKEN is not set".into())
        })?;

        let payload = self.build_payload(request);
        info!("📤 Submitting prediction: {}", payload["input"]);

        let response = self.transport.create_prediction(token, &payload).await?;
        if !response.is_success() {
            return Err(response.into_upstream_error());
        }

        let id = parse_job_id(&response.body)?;
        info!("🆔 Prediction created: {}", id);
        Ok(id)
    }
}

fn parse_job_id(body: &str) -> Result<JobId, GenerationError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| GenerationError::Protocol(format!("prediction response is not JSON: {e}")))?;
    match value.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
        Some(other) => Err(GenerationError::Protocol(format!("malformed prediction id: {other}"))),
        None => Err(GenerationError::Protocol("prediction response has no id".into())),
    }
}
