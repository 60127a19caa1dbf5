//! Loading a persisted index and the reuse-or-build entry point.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use docqa_core::{Chunk, EmbeddedChunk, EmbeddingCapability, Error, Result};

use crate::schema::{body_checksum, IndexHeader, FORMAT_NAME, FORMAT_VERSION, INDEX_FILE, LOCK_FILE};
use crate::writer::{build_with, persist, BuildOptions};
use crate::Index;

/// Read and validate the index stored under `path`.
///
/// Returns `NotFound` when there is no index file and `CorruptIndex` when the
/// file cannot be parsed, fails its checksum, is truncated, or was built with
/// a different dimension than `embed.dim()`.
pub fn load(path: &Path, embed: &dyn EmbeddingCapability) -> Result<Index> {
    let file = path.join(INDEX_FILE);
    let bytes = match fs::read(&file) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound(path.to_path_buf())),
        Err(e) => return Err(Error::corrupt(&file, format!("unreadable: {e}"))),
    };

    let Some(split) = bytes.iter().position(|&b| b == b'\n') else {
        return Err(Error::corrupt(&file, "missing header line"));
    };
    let header: IndexHeader = serde_json::from_slice(&bytes[..split])
        .map_err(|e| Error::corrupt(&file, format!("bad header: {e}")))?;
    if header.format != FORMAT_NAME || header.version != FORMAT_VERSION {
        return Err(Error::corrupt(&file, format!("unsupported format {} v{}", header.format, header.version)));
    }

    let body = &bytes[split + 1..];
    if body_checksum(body) != header.checksum {
        return Err(Error::corrupt(&file, "checksum mismatch"));
    }
    if header.dimension != embed.dim() {
        return Err(Error::corrupt(
            &file,
            format!("index dimension {} does not match embedder dimension {}", header.dimension, embed.dim()),
        ));
    }
    if header.embedder_id != embed.embedder_id() {
        warn!("index at {} was built with {}, querying with {}", path.display(), header.embedder_id, embed.embedder_id());
    }

    let mut entries: Vec<EmbeddedChunk> = Vec::with_capacity(header.entries);
    for (lineno, line) in body.split(|&b| b == b'\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        let entry: EmbeddedChunk = serde_json::from_slice(line)
            .map_err(|e| Error::corrupt(&file, format!("entry {}: {e}", lineno + 1)))?;
        entries.push(entry);
    }
    if entries.len() != header.entries {
        return Err(Error::corrupt(&file, format!("expected {} entries, found {}", header.entries, entries.len())));
    }

    let index = Index::from_entries(entries, header.embedder_id, header.dimension, header.created_at)
        .map_err(|e| Error::corrupt(&file, e.to_string()))?;
    debug!(entries = index.len(), path = %path.display(), "loaded index");
    Ok(index)
}

/// Load the index at `path`, or build it from `chunks` and persist it.
///
/// An existing valid index always wins over `chunks`. Builders of the same
/// path are serialised by [`PathLock`], and the load is retried once the lock
/// is held so that a concurrent builder's result is reused. A corrupt index is
/// rebuilt.
pub async fn get_or_build(
    path: &Path,
    chunks: &[Chunk],
    embed: &dyn EmbeddingCapability,
    options: &BuildOptions,
) -> Result<Index> {
    if let Some(index) = try_reuse(path, embed)? {
        return Ok(index);
    }

    fs::create_dir_all(path)?;
    let _lock = PathLock::acquire(path).await?;
    if let Some(index) = try_reuse(path, embed)? {
        return Ok(index);
    }

    info!("Building index at {} from {} chunks", path.display(), chunks.len());
    let index = build_with(chunks, embed, options).await?;
    persist(&index, path)?;
    Ok(index)
}

fn try_reuse(path: &Path, embed: &dyn EmbeddingCapability) -> Result<Option<Index>> {
    match load(path, embed) {
        Ok(index) => {
            info!("Reusing index at {} ({} entries)", path.display(), index.len());
            Ok(Some(index))
        }
        Err(Error::NotFound(_)) => Ok(None),
        Err(Error::CorruptIndex { path: file, reason }) => {
            warn!("discarding corrupt index {}: {}", file.display(), reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Exclusive advisory lock on `<dir>/.lock`, released on drop.
#[derive(Debug)]
pub struct PathLock {
    file: File,
    path: PathBuf,
}

impl PathLock {
    /// Blocks (on the blocking pool) until the lock is granted.
    pub async fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let lock_path = path.clone();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new().create(true).truncate(false).read(true).write(true).open(&lock_path)?;
            file.lock()?;
            Ok(file)
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;
        debug!(path = %path.display(), "acquired index lock");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl Drop for PathLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("failed to release {}: {}", self.path.display(), e);
        }
    }
}
