use async_trait::async_trait;

use crate::error::{Error, Result};

/// Maps text to fixed-length vectors. Implementations report failures with
/// `Error::Transient` (retryable) or `Error::Auth` / `Error::Quota` (fatal).
#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-small`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Embed a batch; output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Provider("embedder returned no vector".to_string()))
    }
}

/// Maps a prompt to a text completion. Same failure taxonomy as embedding.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    fn model_id(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}
