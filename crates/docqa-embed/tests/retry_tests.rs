use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docqa_core::{EmbeddingCapability, Error, ErrorKind, GenerationCapability, Result};
use docqa_embed::{RetryPolicy, Retrying};

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        timeout: Duration::from_millis(100),
    }
}

/// Fails with `failure` for the first `failures` calls, then succeeds.
struct Flaky {
    calls: Arc<AtomicUsize>,
    failures: usize,
    failure: fn() -> Error,
    delay: Option<Duration>,
}

#[async_trait]
impl GenerationCapability for Flaky {
    fn model_id(&self) -> &str { "flaky" }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            } else {
                return Err((self.failure)());
            }
        }
        Ok(format!("echo: {prompt}"))
    }
}

#[async_trait]
impl EmbeddingCapability for Flaky {
    fn embedder_id(&self) -> &str { "flaky" }
    fn dim(&self) -> usize { 2 }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err((self.failure)());
        }
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

fn flaky(failures: usize, failure: fn() -> Error) -> (Flaky, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (Flaky { calls: calls.clone(), failures, failure, delay: None }, calls)
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let (inner, calls) = flaky(2, || Error::Transient("503".into()));
    let gen = Retrying::new(inner, fast_policy(3));
    assert_eq!(gen.generate("q").await.expect("generate"), "echo: q");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let (inner, calls) = flaky(10, || Error::Transient("503".into()));
    let gen = Retrying::new(inner, fast_policy(2));
    let err = gen.generate("q").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(calls.load(Ordering::SeqCst), 3, "one attempt plus two retries");
}

#[tokio::test]
async fn auth_and_quota_are_never_retried() {
    let (inner, calls) = flaky(5, || Error::Auth("401".into()));
    let err = Retrying::new(inner, fast_policy(3)).generate("q").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (inner, calls) = flaky(5, || Error::Quota("insufficient_quota".into()));
    let err = Retrying::new(inner, fast_policy(3)).embed_batch(&["a".into()]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Quota);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn timed_out_attempt_counts_as_transient() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = Flaky {
        calls: calls.clone(),
        failures: 1,
        failure: || Error::Transient("unused".into()),
        delay: Some(Duration::from_millis(500)),
    };
    let gen = Retrying::new(inner, fast_policy(1));
    assert_eq!(gen.generate("q").await.expect("second attempt succeeds"), "echo: q");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn backoff_grows_and_is_capped() {
    let policy = RetryPolicy {
        max_retries: 10,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(1_000),
        timeout: Duration::from_secs(1),
    };
    assert_eq!(policy.backoff(0), Duration::from_millis(100));
    assert_eq!(policy.backoff(1), Duration::from_millis(200));
    assert_eq!(policy.backoff(3), Duration::from_millis(800));
    assert_eq!(policy.backoff(4), Duration::from_millis(1_000));
    assert_eq!(policy.backoff(40), Duration::from_millis(1_000));
}
