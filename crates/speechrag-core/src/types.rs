//! Domain types shared by the segmenter, the vector index and the service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Meta = HashMap<String, String>;
pub type Vector = Vec<f32>;

/// Metadata key holding the document's source path.
pub const SOURCE_KEY: &str = "source";

/// The single source document: raw text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }

    /// Metadata every chunk of this document inherits.
    pub fn metadata(&self) -> Meta {
        let mut meta = Meta::new();
        meta.insert(SOURCE_KEY.to_string(), self.source.clone());
        meta
    }
}

/// A contiguous, possibly overlapping slice of the document.
///
/// - `text`: the substring, never empty
/// - `sequence_index`: dense 0-based position in document order
/// - `start`/`end`: byte offsets of `text` within the document
/// - `metadata`: carried from the document, opaque to the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub sequence_index: usize,
    pub start: usize,
    pub end: usize,
    pub metadata: Meta,
}

/// A chunk together with its embedding. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub vector: Vector,
}

/// One retrieval hit. Higher `score` is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Hits ordered by descending score, ties by ascending `sequence_index`.
pub type RetrievalResult = Vec<ScoredChunk>;
