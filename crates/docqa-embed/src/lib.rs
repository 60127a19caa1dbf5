//! docqa-embed
//!
//! Implementations of the embedding and generation capabilities plus the
//! factory functions the binary uses to pick one from configuration.

use std::sync::Arc;
use tracing::info;

use docqa_core::config::{EmbeddingProviderKind, Settings};
use docqa_core::{EmbeddingCapability, GenerationCapability, Result};

pub mod hash;
pub mod openai;
pub mod retry;

pub use hash::HashEmbedder;
pub use openai::OpenAiClient;
pub use retry::{with_retry, RetryPolicy, Retrying};

fn fake_embeddings_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Embedder selected by `embedding.provider`, overridable with
/// `APP_USE_FAKE_EMBEDDINGS=1`. Remote embedders are wrapped in [`Retrying`].
pub fn get_default_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingCapability>> {
    if fake_embeddings_requested() || settings.embedding.provider == EmbeddingProviderKind::Hash {
        info!("Using HashEmbedder (d={})", settings.embedding.dimension);
        return Ok(Arc::new(HashEmbedder::new(settings.embedding.dimension)));
    }
    let client = OpenAiClient::new(settings)?;
    Ok(Arc::new(Retrying::new(client, RetryPolicy::from_settings(&settings.provider))))
}

pub fn get_default_generator(settings: &Settings) -> Result<Arc<dyn GenerationCapability>> {
    let client = OpenAiClient::new(settings)?;
    Ok(Arc::new(Retrying::new(client, RetryPolicy::from_settings(&settings.provider))))
}
