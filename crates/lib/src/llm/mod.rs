//! Provider gateway: the opaque call to the generative model.
//!
//! Handlers hold an `Arc<dyn Provider>` so tests can substitute a stub.

mod gemini;

pub use gemini::GeminiClient;

use crate::image::ImagePart;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider api error: {0}")]
    Api(String),
    #[error("provider returned no text")]
    EmptyResponse,
}

/// A generative model that turns a prompt (and optionally one image) into text.
#[async_trait]
pub trait Provider: Send + Sync {
    /// False when no credential was configured; callers must not call `generate` then.
    fn is_configured(&self) -> bool;

    /// One model call. No retries; responses may differ between identical calls.
    async fn generate(&self, prompt: &str, image: Option<&ImagePart>)
        -> Result<String, ProviderError>;
}

#[cfg(test)]
pub(crate) mod stub;
