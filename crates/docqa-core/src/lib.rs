//! docqa-core
//!
//! Data model, error taxonomy, capability traits, configuration, document
//! loading and chunking shared by every other docqa crate.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use traits::{EmbeddingCapability, GenerationCapability};
pub use types::{Chunk, ChunkId, Document, EmbeddedChunk, QueryResult, ScoredChunk};

/// Number of chunks retrieved per question when nothing else is configured.
pub const DEFAULT_TOP_K: usize = 4;
