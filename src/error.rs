use thiserror::Error;

/// Every way a single `generate` call can end without an image URL.
///
/// Kinds are surfaced unchanged from the stage that produced them; callers
/// map them to user-facing messages (see `routes`).
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("upstream error (status={}): {body}", .status.map(|s| s.to_string()).unwrap_or_else(|| "none".into()))]
    Upstream { status: Option<u16>, body: String },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("image generation failed: {0}")]
    GenerationFailed(String),
    #[error("image generation timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::Upstream { .. } => "upstream",
            Self::Protocol(_) => "protocol",
            Self::GenerationFailed(_) => "generation_failed",
            Self::Timeout { .. } => "timeout",
        }
    }

    pub(crate) fn transport(e: impl std::fmt::Display) -> Self {
        Self::Upstream { status: None, body: e.to_string() }
    }
}
