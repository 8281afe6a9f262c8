use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::info;

use speechrag_core::traits::Embedder;
use speechrag_core::types::{Chunk, IndexedChunk};
use speechrag_core::{Error, Result};

use crate::index::VectorIndex;
use crate::manifest::IndexManifest;

/// Embed `chunks` in batches of `batch_size`. The bar is only drawn when
/// `show_progress` is set.
pub fn embed_chunks(embedder: &dyn Embedder, chunks: Vec<Chunk>, batch_size: usize, show_progress: bool) -> Result<Vec<IndexedChunk>> {
    let batch_size = batch_size.max(1);
    let pb = if show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);

    let started = Instant::now();
    let mut out = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).map_err(|e| Error::capability("embedding", e))?;
        if vectors.len() != batch.len() {
            return Err(Error::capability(
                "embedding",
                anyhow::anyhow!("embedder returned {} vectors for {} texts", vectors.len(), batch.len()),
            ));
        }
        for (chunk, vector) in batch.iter().zip(vectors) {
            if vector.len() != embedder.dim() {
                return Err(Error::DimensionMismatch { expected: embedder.dim(), actual: vector.len() });
            }
            out.push(IndexedChunk { chunk: chunk.clone(), vector });
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedded");
    let ms = started.elapsed().as_millis() as u64;
    info!(chunks = out.len(), embedder = embedder.id(), ms, "chunks embedded");
    Ok(out)
}

/// Embed and index `chunks`, stamping the result with `fingerprint`.
pub fn build_index(embedder: &dyn Embedder, chunks: Vec<Chunk>, fingerprint: String, batch_size: usize, show_progress: bool) -> Result<VectorIndex> {
    if chunks.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    let entries = embed_chunks(embedder, chunks, batch_size, show_progress)?;
    let manifest = IndexManifest::new(fingerprint, embedder.id(), embedder.dim(), entries.len());
    Ok(VectorIndex::build(entries)?.with_manifest(manifest))
}
