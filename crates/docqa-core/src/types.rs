//! Domain types shared by the chunker, index store, retriever and answerer.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// A loaded source file. `source` is the path it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A window of a document's text.
///
/// - `offset`: position of the first character within the source, counted in
///   characters rather than bytes
/// - `chunk_index`: ordinal of this chunk among the chunks of its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub offset: usize,
    pub chunk_index: usize,
}

impl Chunk {
    /// Content-derived identifier: identical `(source, offset, text)` always
    /// maps to the same id.
    pub fn stable_id(&self) -> ChunkId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.source.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.offset.to_string().as_bytes());
        hasher.update(&[0]);
        hasher.update(self.text.as_bytes());
        hasher.finalize().to_hex()[..32].to_string()
    }
}

/// A chunk together with its embedding, as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub id: ChunkId,
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// One retrieval hit. Higher `score` is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Hits ordered by descending score.
pub type QueryResult = Vec<ScoredChunk>;
