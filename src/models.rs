use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::style::DEFAULT_PRESET;

/// Options the UI sends along with a prompt.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub samples: Option<u32>,
    #[serde(default)]
    pub guidance_scale: Option<f64>,
    // Accepted for client compatibility; not forwarded to the provider.
    #[serde(default)]
    pub enhance_prompt: Option<bool>,
    #[serde(default)]
    pub seed: Option<i64>,
}

/// Fully resolved input for one submission. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub preset_id: String,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub guidance_scale: f64,
}

impl GenerationRequest {
    pub const DEFAULT_SIZE: u32 = 1024;
    pub const DEFAULT_GUIDANCE: f64 = 7.5;

    pub fn new(prompt: &str, preset_id: &str, settings: &GenerationSettings) -> Self {
        Self {
            prompt: prompt.to_string(),
            preset_id: preset_id.to_string(),
            width: settings.width.unwrap_or(Self::DEFAULT_SIZE),
            height: settings.height.unwrap_or(Self::DEFAULT_SIZE),
            sample_count: settings.samples.unwrap_or(1),
            guidance_scale: settings.guidance_scale.unwrap_or(Self::DEFAULT_GUIDANCE),
        }
    }
}

pub type JobId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Maps the provider's status string. `None` for values we don't know.
    pub fn from_provider(status: &str) -> Option<Self> {
        match status {
            "starting" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "succeeded" => Some(Self::Succeeded),
            "failed" | "canceled" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Latest snapshot of a remote prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub output_urls: Vec<String>,
    pub error_detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateBody {
    pub prompt: String,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default)]
    pub settings: GenerationSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_url: String,
    pub prompt: String,
    pub preset: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchGenerateBody {
    pub prompts: Vec<String>,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default)]
    pub settings: GenerationSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateImageBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: Uuid,
    pub prompt: String,
    pub image_url: String,
    pub preset: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: DateTime<Utc>,
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
