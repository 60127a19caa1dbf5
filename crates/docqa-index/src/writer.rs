use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use docqa_core::{Chunk, EmbeddedChunk, EmbeddingCapability, Error, Result};

use crate::schema::{IndexHeader, INDEX_FILE};
use crate::Index;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Texts per `embed_batch` call.
    pub batch_size: usize,
    /// Batches in flight at once.
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { batch_size: 64, concurrency: 4, show_progress: false }
    }
}

/// Embed `chunks` with default [`BuildOptions`].
pub async fn build(chunks: &[Chunk], embed: &dyn EmbeddingCapability) -> Result<Index> {
    build_with(chunks, embed, &BuildOptions::default()).await
}

/// Embed every chunk and assemble an [`Index`] in chunk order.
///
/// Batches run concurrently up to `options.concurrency` but are reassembled
/// in submission order. The first failing batch aborts the build.
pub async fn build_with(chunks: &[Chunk], embed: &dyn EmbeddingCapability, options: &BuildOptions) -> Result<Index> {
    if chunks.is_empty() {
        return Err(Error::EmptyInput);
    }
    let dim = embed.dim();
    let batch_size = options.batch_size.max(1);
    info!("Embedding {} chunks with {} (batch={}, concurrency={})", chunks.len(), embed.embedder_id(), batch_size, options.concurrency.max(1));

    let pb = if options.show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
        pb.set_style(style.progress_chars("#>-"));
    }

    let batches: Vec<Vec<String>> = chunks
        .chunks(batch_size)
        .map(|batch| batch.iter().map(|c| c.text.clone()).collect())
        .collect();
    let pb_ref = &pb;
    let vectors: Vec<Vec<Vec<f32>>> = stream::iter(batches.into_iter().map(|texts| async move {
        let out = embed.embed_batch(&texts).await?;
        if out.len() != texts.len() {
            return Err(Error::Provider(format!("embedder returned {} vectors for {} inputs", out.len(), texts.len())));
        }
        pb_ref.inc(texts.len() as u64);
        Ok(out)
    }))
    .buffered(options.concurrency.max(1))
    .try_collect()
    .await?;

    let mut entries = Vec::with_capacity(chunks.len());
    for (chunk, embedding) in chunks.iter().zip(vectors.into_iter().flatten()) {
        if embedding.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: embedding.len() });
        }
        entries.push(EmbeddedChunk { id: chunk.stable_id(), chunk: chunk.clone(), embedding });
    }
    pb.finish_with_message("index built");
    debug!(entries = entries.len(), "built index");
    Index::from_entries(entries, embed.embedder_id(), dim, Utc::now())
}

/// Write `index` to `<path>/index.jsonl`, creating `path` if needed.
///
/// The data goes to a temp file in the same directory, is fsynced, and is then
/// renamed over the previous file, so readers see either the old index or the
/// new one in full.
pub fn persist(index: &Index, path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;

    let mut body = Vec::new();
    for entry in index.entries() {
        serde_json::to_writer(&mut body, entry).map_err(std::io::Error::from)?;
        body.push(b'\n');
    }
    let header = IndexHeader::new(index.embedder_id(), index.dimension(), index.len(), &body, index.created_at());

    let mut tmp = NamedTempFile::new_in(path)?;
    serde_json::to_writer(&mut tmp, &header).map_err(std::io::Error::from)?;
    tmp.write_all(b"\n")?;
    tmp.write_all(&body)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    let target = path.join(INDEX_FILE);
    tmp.persist(&target).map_err(|e| Error::Io(e.error))?;
    info!("Persisted {} entries to {}", index.len(), target.display());
    Ok(())
}
