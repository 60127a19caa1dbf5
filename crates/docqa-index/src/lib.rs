//! docqa-index
//!
//! Persistent vector index over embedded chunks: building it from chunks,
//! writing it atomically, loading and validating it, and ranking entries
//! against a query vector.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use docqa_core::{ChunkId, EmbeddedChunk, Error, Result};

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::{cosine_similarity, query};
pub use table::{get_or_build, load, PathLock};
pub use writer::{build, build_with, persist, BuildOptions};

/// In-memory index. Entries keep insertion order, which is also the
/// tie-break order for equal retrieval scores.
#[derive(Debug, Clone)]
pub struct Index {
    entries: Vec<EmbeddedChunk>,
    positions: HashMap<ChunkId, usize>,
    embedder_id: String,
    dimension: usize,
    created_at: DateTime<Utc>,
}

impl Index {
    /// Every entry must have exactly `dimension` components.
    pub fn from_entries(
        entries: Vec<EmbeddedChunk>,
        embedder_id: impl Into<String>,
        dimension: usize,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let mut positions = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if entry.embedding.len() != dimension {
                return Err(Error::DimensionMismatch { expected: dimension, actual: entry.embedding.len() });
            }
            positions.entry(entry.id.clone()).or_insert(pos);
        }
        Ok(Self { entries, positions, embedder_id: embedder_id.into(), dimension, created_at })
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn entries(&self) -> &[EmbeddedChunk] { &self.entries }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn dimension(&self) -> usize { self.dimension }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn get(&self, id: &str) -> Option<&EmbeddedChunk> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }
}
