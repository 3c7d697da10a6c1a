use anyhow::Result;
use async_trait::async_trait;

/// Trait that every generative text backend must implement.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
