//! Fixed-size character windows with overlap.
//!
//! Windows are measured in `char`s so a multi-byte code point is never split.
//! Consecutive chunks of one document share exactly `chunk_overlap` characters;
//! only the final chunk may be shorter than `chunk_size`.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split every document into overlapping chunks, preserving document order.
pub fn split(documents: &[Document], chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    let config = ChunkingConfig::new(chunk_size, chunk_overlap)?;
    Ok(split_with(documents, &config))
}

pub fn split_with(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut all_chunks = Vec::new();
    for doc in documents {
        let chunks = split_document(doc, config);
        if chunks.is_empty() {
            warn!(source = %doc.source, "document is empty, no chunks produced");
            continue;
        }
        debug!(source = %doc.source, chunks = chunks.len(), "split document");
        all_chunks.extend(chunks);
    }
    all_chunks
}

fn split_document(doc: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let text = doc.text.as_str();
    if text.is_empty() {
        return Vec::new();
    }
    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + config.chunk_size).min(total_chars);
        chunks.push(Chunk {
            text: text[bounds[start]..bounds[end]].to_string(),
            source: doc.source.clone(),
            offset: start,
            chunk_index: chunks.len(),
        });
        if end >= total_chars {
            break;
        }
        start += config.step();
    }
    chunks
}
