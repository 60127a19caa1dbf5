//! On-disk layout of a persisted index.
//!
//! An index is a directory holding `index.jsonl`: one header line followed by
//! one [`EmbeddedChunk`](docqa_core::EmbeddedChunk) per line, in insertion
//! order. The header's `checksum` is the blake3 hash of every byte after the
//! header line, so truncation and partial writes are detected on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const INDEX_FILE: &str = "index.jsonl";
pub const LOCK_FILE: &str = ".lock";
pub const FORMAT_NAME: &str = "docqa-index";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHeader {
    pub format: String,
    pub version: u32,
    pub embedder_id: String,
    pub dimension: usize,
    pub entries: usize,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl IndexHeader {
    pub fn new(embedder_id: &str, dimension: usize, entries: usize, body: &[u8], created_at: DateTime<Utc>) -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
            embedder_id: embedder_id.to_string(),
            dimension,
            entries,
            checksum: body_checksum(body),
            created_at,
        }
    }
}

pub fn body_checksum(body: &[u8]) -> String {
    blake3::hash(body).to_hex().to_string()
}
