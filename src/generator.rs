use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::info;

use crate::config::Config;
use crate::error::GenerationError;
use crate::models::{GenerationRequest, GenerationSettings};
use crate::poller::{PollPolicy, Poller, Sleeper};
use crate::replicate::Transport;
use crate::submitter::JobSubmitter;

/// Single entry point for "prompt in, image URL out".
pub struct ImageGenerator {
    submitter: JobSubmitter,
    poller: Poller,
    batch_concurrency: usize,
    max_batch_size: usize,
}

impl ImageGenerator {
    pub fn new(config: &Config, transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>) -> Self {
        let policy = PollPolicy {
            interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
        };
        Self {
            submitter: JobSubmitter::new(transport.clone(), config.api_token.clone(), config.model_version.clone()),
            poller: Poller::new(transport, sleeper, config.api_token.clone(), policy),
            batch_concurrency: config.batch_concurrency.max(1),
            max_batch_size: config.max_batch_size,
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        preset_id: &str,
        settings: &GenerationSettings,
    ) -> Result<String, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::Validation("prompt must not be empty".into()));
        }
        let request = GenerationRequest::new(prompt, preset_id, settings);
        validate(&request)?;

        info!("🎯 Generating image (preset '{}'): {}", preset_id, prompt);
        let job_id = self.submitter.submit(&request).await?;
        self.poller.await_result(&job_id).await
    }

    /// Runs one independent generation per prompt, at most
    /// `batch_concurrency` at a time; results keep input order.
    pub async fn generate_batch(
        &self,
        prompts: &[String],
        preset_id: &str,
        settings: &GenerationSettings,
    ) -> Result<Vec<Result<String, GenerationError>>, GenerationError> {
        if prompts.is_empty() {
            return Err(GenerationError::Validation("prompts must not be empty".into()));
        }
        if prompts.len() > self.max_batch_size {
            return Err(GenerationError::Validation(format!(
                "batch of {} prompts exceeds the limit of {}",
                prompts.len(),
                self.max_batch_size
            )));
        }

        info!("📦 Batch of {} prompts (preset '{}', {} at a time)", prompts.len(), preset_id, self.batch_concurrency);
        let futures: Vec<_> = prompts.iter().map(|p| self.generate(p, preset_id, settings)).collect();
        let results = stream::iter(futures)
            .buffered(self.batch_concurrency)
            .collect()
            .await;
        Ok(results)
    }
}

fn validate(request: &GenerationRequest) -> Result<(), GenerationError> {
    if request.width == 0 || request.height == 0 {
        return Err(GenerationError::Validation("width and height must be positive".into()));
    }
    if request.sample_count == 0 {
        return Err(GenerationError::Validation("samples must be at least 1".into()));
    }
    if !(request.guidance_scale.is_finite() && request.guidance_scale > 0.0) {
        return Err(GenerationError::Validation("guidance scale must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeSleeper, FakeTransport};
    use pretty_assertions::assert_eq;

    fn generator(transport: &Arc<FakeTransport>, token: Option<&str>) -> ImageGenerator {
        let config = Config { api_token: token.map(String::from), ..Config::default() };
        ImageGenerator::new(&config, transport.clone(), Arc::new(FakeSleeper::default()))
    }

    #[tokio::test]
    async fn empty_prompt_never_reaches_network() {
        let transport = Arc::new(FakeTransport::new());
        for prompt in ["", "   \n"] {
            let err = generator(&transport, Some("tok"))
                .generate(prompt, "default", &GenerationSettings::default())
                .await
                .unwrap_err();
            assert!(matches!(err, GenerationError::Validation(_)));
        }
        assert_eq!(transport.create_calls(), 0);
        assert_eq!(transport.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn bad_settings_are_rejected_before_submission() {
        let transport = Arc::new(FakeTransport::new());
        let settings = GenerationSettings { width: Some(0), ..Default::default() };
        let err = generator(&transport, Some("tok")).generate("a cat", "anime", &settings).await.unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));

        let settings = GenerationSettings { guidance_scale: Some(-1.0), ..Default::default() };
        let err = generator(&transport, Some("tok")).generate("a cat", "anime", &settings).await.unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
        assert_eq!(transport.create_calls(), 0);
    }

    #[tokio::test]
    async fn anime_prompt_round_trip() {
        let transport = Arc::new(FakeTransport::new());
        transport.on_create(201, r#"{"id": "job-1"}"#);
        transport.on_fetch_status("processing", 1);
        transport.on_fetch(200, r#"{"id": "job-1", "status": "succeeded", "output": ["https://x/y.png"]}"#);

        let url = generator(&transport, Some("tok"))
            .generate("a cat", "anime", &GenerationSettings::default())
            .await
            .unwrap();

        assert_eq!(url, "https://x/y.png");
        assert_eq!(
            transport.submitted()[0].1["input"]["prompt"],
            "a cat, anime style, vibrant colors, 2D illustration, studio ghibli inspired"
        );
        assert_eq!(transport.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn missing_token_surfaces_configuration_error() {
        let transport = Arc::new(FakeTransport::new());
        let err = generator(&transport, None)
            .generate("a cat", "anime", &GenerationSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
        assert_eq!(transport.create_calls(), 0);
    }

    #[tokio::test]
    async fn downstream_errors_are_not_wrapped() {
        let transport = Arc::new(FakeTransport::new());
        transport.on_create(201, r#"{"id": "job-1"}"#);
        transport.on_fetch(200, r#"{"status": "failed", "error": "NSFW content"}"#);

        let err = generator(&transport, Some("tok"))
            .generate("a cat", "default", &GenerationSettings::default())
            .await
            .unwrap_err();
        match err {
            GenerationError::GenerationFailed(detail) => assert_eq!(detail, "NSFW content"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn batch_results_follow_input_order() {
        let transport = Arc::new(FakeTransport::new());
        transport.on_create(201, r#"{"id": "a"}"#);
        transport.on_create(201, r#"{"id": "b"}"#);
        transport.on_fetch(200, r#"{"status": "succeeded", "output": ["https://x/1.png"]}"#);
        transport.on_fetch(200, r#"{"status": "succeeded", "output": ["https://x/2.png"]}"#);

        let prompts = vec!["a cat".to_string(), "  ".to_string(), "a dog".to_string()];
        let results = generator(&transport, Some("tok"))
            .generate_batch(&prompts, "default", &GenerationSettings::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(GenerationError::Validation(_))));
        assert!(results[2].is_ok());
        assert_eq!(transport.create_calls(), 2);
    }

    #[tokio::test]
    async fn batch_runs_at_most_the_configured_number_at_once() {
        let transport = Arc::new(FakeTransport::new());
        for i in 0..6 {
            transport.on_create(201, &format!(r#"{{"id": "job-{i}"}}"#));
            transport.on_fetch(200, r#"{"status": "succeeded", "output": ["https://x/y.png"]}"#);
        }
        let config = Config { api_token: Some("tok".into()), batch_concurrency: 2, ..Config::default() };
        let generator = ImageGenerator::new(&config, transport.clone(), Arc::new(FakeSleeper::default()));

        let prompts: Vec<String> = (0..6).map(|i| format!("prompt {i}")).collect();
        let results = generator
            .generate_batch(&prompts, "default", &GenerationSettings::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.create_calls(), 6);
        assert_eq!(transport.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn oversized_or_empty_batches_are_rejected() {
        let transport = Arc::new(FakeTransport::new());
        let config = Config { api_token: Some("tok".into()), max_batch_size: 3, ..Config::default() };
        let generator = ImageGenerator::new(&config, transport.clone(), Arc::new(FakeSleeper::default()));

        let prompts: Vec<String> = (0..4).map(|i| format!("prompt {i}")).collect();
        let err = generator
            .generate_batch(&prompts, "default", &GenerationSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));

        let err = generator
            .generate_batch(&[], "default", &GenerationSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
        assert_eq!(transport.create_calls(), 0);
    }
}
