use axum::{Json, extract::{Path, State, rejection::JsonRejection}, http::StatusCode, response::{IntoResponse, Response}};
use std::{collections::HashMap, sync::Arc};
use parking_lot::RwLock;
use reqwest::Url;
use serde_json::json;
use uuid::Uuid;
use chrono::Utc;

use crate::{
    error::GenerationError,
    generator::ImageGenerator,
    models::{BatchGenerateBody, BatchItemResult, CreateImageBody, GenerateBody, GenerateResponse, ImageRecord},
    style::{presets, StylePreset, DEFAULT_PRESET},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, ImageRecord>>>,
    pub generator: Arc<ImageGenerator>,
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        let status = match &self {
            GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
            GenerationError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            GenerationError::Upstream { .. } | GenerationError::Protocol(_) => StatusCode::BAD_GATEWAY,
            GenerationError::GenerationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GenerationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };
        (status, Json(json!({ "error": self.to_string(), "kind": self.kind() }))).into_response()
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message, "kind": "validation" }))).into_response()
}

impl From<JsonRejection> for GenerationError {
    fn from(rejection: JsonRejection) -> Self {
        GenerationError::Validation(rejection.body_text())
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, GenerationError> {
    let Json(body) = payload?;
    tracing::info!("🚀 Generate request: preset={} prompt={}", body.preset, body.prompt);
    let image_url = state.generator.generate(&body.prompt, &body.preset, &body.settings).await
        .inspect_err(|e| tracing::error!("❌ Generation failed ({}): {}", e.kind(), e))?;
    Ok(Json(GenerateResponse { image_url, prompt: body.prompt, preset: body.preset }))
}

pub async fn generate_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchGenerateBody>, JsonRejection>,
) -> Result<Response, GenerationError> {
    let Json(body) = payload?;
    let results = state.generator.generate_batch(&body.prompts, &body.preset, &body.settings).await?;
    let results: Vec<BatchItemResult> = body.prompts.into_iter().zip(results).map(|(prompt, result)| match result {
        Ok(url) => BatchItemResult { prompt, image_url: Some(url), error: None },
        Err(e) => BatchItemResult { prompt, image_url: None, error: Some(e.to_string()) },
    }).collect();

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    tracing::info!("✅ Batch finished: {} ok, {} failed", results.len() - failed, failed);
    Ok(Json(json!({ "results": results })).into_response())
}

pub async fn list_presets() -> Json<&'static [StylePreset]> {
    Json(presets())
}

pub async fn create_image(
    State(state): State<AppState>,
    payload: Result<Json<CreateImageBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return GenerationError::from(rejection).into_response(),
    };
    let prompt = body.prompt.filter(|p| !p.trim().is_empty());
    let image_url = body.image_url.filter(|u| !u.trim().is_empty());
    let (Some(prompt), Some(image_url)) = (prompt, image_url) else {
        return bad_request("Prompt and image URL are required");
    };
    if !is_http_url(&image_url) {
        return bad_request("Invalid image URL provided");
    }

    let image = ImageRecord {
        id: Uuid::new_v4(),
        prompt,
        image_url,
        preset: body.preset.filter(|p| !p.is_empty()).unwrap_or_else(|| DEFAULT_PRESET.to_string()),
        width: body.width,
        height: body.height,
        created_at: Utc::now(),
    };
    state.store.write().insert(image.id, image.clone());
    tracing::info!("🖼️ Stored image record {}", image.id);
    (StatusCode::CREATED, Json(json!({ "image": image }))).into_response()
}

pub async fn list_images(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut images: Vec<ImageRecord> = state.store.read().values().cloned().collect();
    images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(json!({ "images": images }))
}

pub async fn get_image(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    if let Some(image) = state.store.read().get(&id).cloned() {
        Json(json!({ "image": image })).into_response()
    } else {
        not_found("Image not found")
    }
}

pub async fn delete_image(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    if state.store.write().remove(&id).is_some() {
        tracing::info!("🗑️ Deleted image record {}", id);
        Json(json!({ "message": "Image deleted successfully" })).into_response()
    } else {
        not_found("Image not found")
    }
}

fn is_http_url(s: &str) -> bool {
    Url::parse(s).map(|u| matches!(u.scheme(), "http" | "https")).unwrap_or(false)
}
