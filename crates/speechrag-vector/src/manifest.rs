//! Provenance record stored next to a persisted index.
//!
//! The fingerprint ties an index to the exact document text, chunking
//! parameters and embedder that produced it. A persisted index whose
//! fingerprint no longer matches is stale.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use speechrag_core::segmenter::ChunkingConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub fingerprint: String,
    pub embedder_id: String,
    pub dim: usize,
    pub chunk_count: usize,
    /// RFC 3339 build time.
    pub built_at: String,
}

impl IndexManifest {
    pub fn new(fingerprint: String, embedder_id: impl Into<String>, dim: usize, chunk_count: usize) -> Self {
        Self { fingerprint, embedder_id: embedder_id.into(), dim, chunk_count, built_at: Utc::now().to_rfc3339() }
    }

    pub fn matches(&self, fingerprint: &str, dim: usize) -> bool {
        self.fingerprint == fingerprint && self.dim == dim
    }
}

pub fn fingerprint(document_text: &str, chunking: &ChunkingConfig, embedder_id: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(document_text.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(chunking.chunk_size as u64).to_le_bytes());
    hasher.update(&(chunking.chunk_overlap as u64).to_le_bytes());
    hasher.update(chunking.separator.as_bytes());
    hasher.update(&[0]);
    hasher.update(embedder_id.as_bytes());
    hasher.finalize().to_hex().to_string()
}
