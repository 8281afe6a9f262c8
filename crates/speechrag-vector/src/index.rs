use speechrag_core::traits::VectorSearch;
use speechrag_core::types::{IndexedChunk, RetrievalResult, ScoredChunk};
use speechrag_core::{Error, Result};

use crate::manifest::IndexManifest;

/// Exhaustive cosine-similarity index over chunk vectors.
///
/// Every entry has the same dimension. Entries are only ever appended; once the
/// index is shared behind an `Arc` it is read-only.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    entries: Vec<IndexedChunk>,
    norms: Vec<f32>,
    manifest: Option<IndexManifest>,
}

impl VectorIndex {
    /// Build from embedded chunks. Fails with `EmptyCorpus` on empty input and
    /// `DimensionMismatch` when vectors disagree on length.
    pub fn build(entries: Vec<IndexedChunk>) -> Result<Self> {
        let Some(first) = entries.first() else { return Err(Error::EmptyCorpus) };
        let mut index = Self::with_dim(first.vector.len())?;
        index.entries.reserve(entries.len());
        index.norms.reserve(entries.len());
        for entry in entries {
            index.insert(entry)?;
        }
        Ok(index)
    }

    /// An index with no entries yet, filled through [`VectorIndex::insert`].
    /// Retrieval fails with `EmptyIndex` until the first insert.
    pub fn with_dim(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidArgument("vectors must have at least one dimension".to_string()));
        }
        Ok(Self { dim, entries: Vec::new(), norms: Vec::new(), manifest: None })
    }

    pub fn with_manifest(mut self, manifest: IndexManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn insert(&mut self, entry: IndexedChunk) -> Result<()> {
        if entry.vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: entry.vector.len() });
        }
        self.norms.push(l2_norm(&entry.vector));
        self.entries.push(entry);
        Ok(())
    }

    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn entries(&self) -> &[IndexedChunk] { &self.entries }
    pub fn manifest(&self) -> Option<&IndexManifest> { self.manifest.as_ref() }

    /// Top `k` chunks by cosine similarity, highest first. Equal scores keep
    /// document order. Returns `min(k, len)` hits.
    pub fn retrieve(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if self.entries.is_empty() {
            return Err(Error::EmptyIndex);
        }
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (entry, norm))| (i, cosine(query, query_norm, &entry.vector, *norm)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.entries[a.0].chunk.sequence_index.cmp(&self.entries[b.0].chunk.sequence_index))
        });
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }
}

impl VectorSearch for VectorIndex {
    fn dim(&self) -> usize { self.dim }
    fn len(&self) -> usize { self.entries.len() }
    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<RetrievalResult> { self.retrieve(query_vec, k) }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

// Zero vectors score 0 against everything.
fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}
