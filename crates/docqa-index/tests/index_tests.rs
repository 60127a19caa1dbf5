use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use docqa_core::{Chunk, EmbeddingCapability, ErrorKind, Result};
use docqa_embed::HashEmbedder;
use docqa_index::schema::INDEX_FILE;
use docqa_index::{build, get_or_build, load, persist, query, BuildOptions};

fn chunk(source: &str, offset: usize, text: &str) -> Chunk {
    Chunk { text: text.to_string(), source: source.to_string(), offset, chunk_index: 0 }
}

fn abc() -> Vec<Chunk> {
    vec![chunk("a.txt", 0, "alpha"), chunk("b.txt", 0, "beta"), chunk("c.txt", 0, "gamma")]
}

/// Looks vectors up by exact text.
struct Table {
    vectors: HashMap<String, Vec<f32>>,
}

impl Table {
    fn new(pairs: &[(&str, [f32; 3])]) -> Self {
        Self { vectors: pairs.iter().map(|(t, v)| (t.to_string(), v.to_vec())).collect() }
    }
}

#[async_trait]
impl EmbeddingCapability for Table {
    fn embedder_id(&self) -> &str { "table" }
    fn dim(&self) -> usize { 3 }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectors.get(t).cloned().unwrap_or_else(|| vec![0.0; 3])).collect())
    }
}

/// Counts every text it is asked to embed.
struct Counting {
    inner: HashEmbedder,
    texts: AtomicUsize,
    delay: Duration,
}

impl Counting {
    fn new(dim: usize) -> Self {
        Self { inner: HashEmbedder::new(dim), texts: AtomicUsize::new(0), delay: Duration::ZERO }
    }
    fn embedded(&self) -> usize { self.texts.load(Ordering::SeqCst) }
}

#[async_trait]
impl EmbeddingCapability for Counting {
    fn embedder_id(&self) -> &str { self.inner.embedder_id() }
    fn dim(&self) -> usize { self.inner.dim() }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.embed_batch(texts).await
    }
}

#[tokio::test]
async fn build_from_empty_is_empty_input() {
    let err = build(&[], &HashEmbedder::new(8)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyInput);
}

#[tokio::test]
async fn build_preserves_chunk_order_across_batches() -> anyhow::Result<()> {
    let chunks: Vec<Chunk> = (0..25).map(|i| chunk("doc.txt", i * 10, &format!("chunk number {i}"))).collect();
    let options = BuildOptions { batch_size: 4, concurrency: 3, show_progress: false };
    let index = docqa_index::build_with(&chunks, &HashEmbedder::new(16), &options).await?;
    assert_eq!(index.len(), chunks.len());
    for (entry, chunk) in index.entries().iter().zip(&chunks) {
        assert_eq!(&entry.chunk, chunk);
        assert_eq!(entry.id, chunk.stable_id());
        assert!(index.get(&entry.id).is_some());
    }
    Ok(())
}

#[tokio::test]
async fn query_with_entry_embedding_ranks_it_first() -> anyhow::Result<()> {
    let embed = Table::new(&[("alpha", [1.0, 0.0, 0.0]), ("beta", [0.0, 1.0, 0.0]), ("gamma", [0.6, 0.8, 0.0])]);
    let index = build(&abc(), &embed).await?;

    let hits = query(&index, &[0.0, 1.0, 0.0], 3)?;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].chunk.text, "beta");
    assert!((hits[0].score - 1.0).abs() < 1e-6, "score was {}", hits[0].score);
    assert_eq!(hits[1].chunk.text, "gamma");
    assert_eq!(hits[2].chunk.text, "alpha");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    Ok(())
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() -> anyhow::Result<()> {
    let embed = Table::new(&[("alpha", [1.0, 0.0, 0.0]), ("beta", [1.0, 0.0, 0.0]), ("gamma", [1.0, 0.0, 0.0])]);
    let index = build(&abc(), &embed).await?;
    let hits = query(&index, &[1.0, 0.0, 0.0], 2)?;
    let texts: Vec<_> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
    assert_eq!(texts, ["alpha", "beta"]);
    Ok(())
}

#[tokio::test]
async fn k_bounds() -> anyhow::Result<()> {
    let embed = Table::new(&[("alpha", [1.0, 0.0, 0.0]), ("beta", [0.0, 1.0, 0.0]), ("gamma", [0.0, 0.0, 1.0])]);
    let index = build(&abc(), &embed).await?;
    assert_eq!(query(&index, &[1.0, 1.0, 1.0], 10)?.len(), 3);
    assert!(query(&index, &[1.0, 1.0, 1.0], 0)?.is_empty());
    assert_eq!(query(&index, &[1.0, 1.0], 2).unwrap_err().kind(), ErrorKind::DimensionMismatch);
    Ok(())
}

#[test]
fn query_on_empty_index_is_empty_index() {
    let index = docqa_index::Index::from_entries(Vec::new(), "hash", 3, chrono::Utc::now()).expect("index");
    assert_eq!(query(&index, &[1.0, 0.0, 0.0], 4).unwrap_err().kind(), ErrorKind::EmptyIndex);
}

#[tokio::test]
async fn persist_then_load_round_trips() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("store");
    let embed = HashEmbedder::new(16);
    let index = build(&abc(), &embed).await?;
    persist(&index, &dir)?;

    let loaded = load(&dir, &embed)?;
    assert_eq!(loaded.entries(), index.entries());
    assert_eq!(loaded.embedder_id(), embed.embedder_id());
    assert_eq!(loaded.dimension(), 16);
    assert_eq!(loaded.created_at(), index.created_at());
    Ok(())
}

#[test]
fn load_missing_is_not_found() {
    let tmp = TempDir::new().expect("tmp");
    let err = load(&tmp.path().join("nope"), &HashEmbedder::new(8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn truncated_or_empty_index_is_corrupt() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let embed = HashEmbedder::new(16);
    persist(&build(&abc(), &embed).await?, tmp.path())?;

    let file = tmp.path().join(INDEX_FILE);
    let bytes = std::fs::read(&file)?;
    std::fs::write(&file, &bytes[..bytes.len() - 20])?;
    assert_eq!(load(tmp.path(), &embed).unwrap_err().kind(), ErrorKind::CorruptIndex);

    std::fs::write(&file, b"")?;
    assert_eq!(load(tmp.path(), &embed).unwrap_err().kind(), ErrorKind::CorruptIndex);

    std::fs::write(&file, b"not json\n{}\n")?;
    assert_eq!(load(tmp.path(), &embed).unwrap_err().kind(), ErrorKind::CorruptIndex);
    Ok(())
}

#[tokio::test]
async fn dimension_mismatch_on_load_is_corrupt() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    persist(&build(&abc(), &HashEmbedder::new(8)).await?, tmp.path())?;
    let err = load(tmp.path(), &HashEmbedder::new(16)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptIndex);
    Ok(())
}

#[tokio::test]
async fn get_or_build_twice_reuses_without_embedding() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("vector_store");
    let embed = Counting::new(16);
    let options = BuildOptions::default();

    let first = get_or_build(&dir, &abc(), &embed, &options).await?;
    assert_eq!(embed.embedded(), 3);

    // Different chunks are ignored once an index exists.
    let other = vec![chunk("z.txt", 0, "something else entirely")];
    let second = get_or_build(&dir, &other, &embed, &options).await?;
    assert_eq!(embed.embedded(), 3, "second call embeds nothing");
    assert_eq!(first.entries(), second.entries());
    Ok(())
}

#[tokio::test]
async fn get_or_build_replaces_a_corrupt_index() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    std::fs::write(tmp.path().join(INDEX_FILE), b"garbage")?;
    let embed = Counting::new(16);
    let index = get_or_build(tmp.path(), &abc(), &embed, &BuildOptions::default()).await?;
    assert_eq!(index.len(), 3);
    assert_eq!(load(tmp.path(), &embed)?.entries(), index.entries());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_or_build_builds_once() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("shared");
    let embed = Arc::new(Counting { delay: Duration::from_millis(100), ..Counting::new(16) });

    let mut handles = Vec::new();
    for _ in 0..4 {
        let dir = dir.clone();
        let embed = embed.clone();
        handles.push(tokio::spawn(async move {
            get_or_build(&dir, &abc(), embed.as_ref(), &BuildOptions::default()).await
        }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await??);
    }

    assert_eq!(embed.embedded(), 3, "exactly one build");
    for index in &results[1..] {
        assert_eq!(index.entries(), results[0].entries());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_build_releases_the_lock() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let dir = tmp.path().join("store");
    let slow = Arc::new(Counting { delay: Duration::from_secs(30), ..Counting::new(16) });

    let task_dir = dir.clone();
    let task_embed = slow.clone();
    let stuck = tokio::spawn(async move {
        get_or_build(&task_dir, &abc(), task_embed.as_ref(), &BuildOptions::default()).await
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    stuck.abort();
    assert!(stuck.await.unwrap_err().is_cancelled());

    let fast = Counting::new(16);
    let index = tokio::time::timeout(
        Duration::from_secs(5),
        get_or_build(&dir, &abc(), &fast, &BuildOptions::default()),
    )
    .await??;
    assert_eq!(index.len(), 3);
    assert_eq!(fast.embedded(), 3);
    Ok(())
}

#[test]
fn non_finite_embeddings_rank_below_real_matches() {
    let entry = |text: &str, embedding: Vec<f32>| docqa_core::EmbeddedChunk {
        id: text.to_string(),
        chunk: chunk("n.txt", 0, text),
        embedding,
    };
    let index = docqa_index::Index::from_entries(
        vec![
            entry("broken", vec![f32::NAN, 0.0, 0.0]),
            entry("match", vec![1.0, 0.0, 0.0]),
            entry("orthogonal", vec![0.0, 1.0, 0.0]),
        ],
        "table",
        3,
        chrono::Utc::now(),
    )
    .expect("index");

    let hits = query(&index, &[1.0, 0.0, 0.0], 3).expect("query");
    let texts: Vec<_> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
    assert_eq!(texts, ["match", "broken", "orthogonal"]);
    assert_eq!(hits[1].score, 0.0);
}
