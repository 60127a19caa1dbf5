//! Per-call timeout plus bounded exponential backoff around a capability.
//!
//! Only `Error::Transient` is retried; a timed-out attempt is reported as
//! `Error::Transient`. `Auth`, `Quota` and every other error return at once.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use docqa_core::config::ProviderSettings;
use docqa_core::{EmbeddingCapability, Error, GenerationCapability, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&ProviderSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transient(format!("{op} timed out after {:?}", policy.timeout))),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                attempt += 1;
                warn!(op, attempt, max_retries = policy.max_retries, delay_ms = delay.as_millis() as u64, error = %e, "transient failure, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wraps an embedding or generation capability with [`with_retry`].
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T { &self.inner }
    pub fn policy(&self) -> &RetryPolicy { &self.policy }
}

#[async_trait]
impl<T: EmbeddingCapability> EmbeddingCapability for Retrying<T> {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }
    fn dim(&self) -> usize { self.inner.dim() }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = &self.inner;
        with_retry(&self.policy, "embed", move || inner.embed_batch(texts)).await
    }
}

#[async_trait]
impl<T: GenerationCapability> GenerationCapability for Retrying<T> {
    fn model_id(&self) -> &str { self.inner.model_id() }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let inner = &self.inner;
        with_retry(&self.policy, "generate", move || inner.generate(prompt)).await
    }
}
