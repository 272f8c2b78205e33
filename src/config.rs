use std::time::Duration;

pub const DEFAULT_PREDICTIONS_URL: &str = "https://api.replicate.com/v1/predictions";
pub const DEFAULT_MODEL_VERSION: &str =
    "stability-ai/sdxl:8beff3369e81422112d93b89ca01426147de542cd4684c244b673b105188fe5f";

#[derive(Debug, Clone)]
pub struct Config {
    /// Provider token. `None` is allowed at startup; generation then fails
    /// with a configuration error while the rest of the API keeps serving.
    pub api_token: Option<String>,
    pub predictions_url: String,
    pub model_version: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Upper bound for a single provider HTTP request.
    pub request_timeout: Duration,
    pub batch_concurrency: usize,
    pub max_batch_size: usize,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            predictions_url: DEFAULT_PREDICTIONS_URL.to_string(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 60,
            request_timeout: Duration::from_secs(30),
            batch_concurrency: 4,
            max_batch_size: 20,
            port: 8080,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_token: non_empty(lookup("REPLICATE_API_TOKEN")),
            predictions_url: non_empty(lookup("REPLICATE_API_BASE"))
                .map(|v| v.trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.predictions_url),
            model_version: non_empty(lookup("REPLICATE_MODEL_VERSION")).unwrap_or(defaults.model_version),
            poll_interval: positive::<u64>(lookup("POLL_INTERVAL_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            max_poll_attempts: positive(lookup("MAX_POLL_ATTEMPTS")).unwrap_or(defaults.max_poll_attempts),
            request_timeout: positive::<u64>(lookup("REQUEST_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            batch_concurrency: positive(lookup("BATCH_CONCURRENCY")).unwrap_or(defaults.batch_concurrency),
            max_batch_size: positive(lookup("MAX_BATCH_SIZE")).unwrap_or(defaults.max_batch_size),
            port: lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
        }
    }

    /// Short form of the token that is safe to log.
    pub fn token_hint(&self) -> String {
        match &self.api_token {
            Some(t) if t.chars().count() > 8 => {
                let head: String = t.chars().take(4).collect();
                let tail: String = t.chars().skip(t.chars().count() - 4).collect();
                format!("{head}...{tail}")
            }
            Some(_) => "set".to_string(),
            None => "not set".to_string(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn positive<T: std::str::FromStr + Default + PartialOrd>(value: Option<String>) -> Option<T> {
    value
        .and_then(|v| v.trim().parse().ok())
        .filter(|n| *n > T::default())
}
