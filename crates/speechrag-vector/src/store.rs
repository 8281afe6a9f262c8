//! On-disk form of a [`VectorIndex`]: a LanceDB directory with a `chunks`
//! table and a `meta` key/value table.

use anyhow::{anyhow, bail, Context};
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, StringArray};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use speechrag_core::types::{Chunk, IndexedChunk, Meta};
use speechrag_core::{Error, Result};

use crate::index::VectorIndex;
use crate::manifest::IndexManifest;
use crate::schema::{build_chunks_schema, CHUNKS_TABLE};
use crate::table::{create_table_with, open_db, read_all, read_meta, string_column, write_meta};

const KEY_DIM: &str = "dim";
const KEY_CHUNK_COUNT: &str = "chunk_count";
const KEY_FINGERPRINT: &str = "fingerprint";
const KEY_EMBEDDER_ID: &str = "embedder_id";
const KEY_BUILT_AT: &str = "built_at";

/// True when `path` looks like a persisted index. Says nothing about whether
/// it loads.
pub fn index_exists(path: &Path) -> bool {
    path.join(format!("{}.lance", CHUNKS_TABLE)).is_dir()
}

impl VectorIndex {
    /// Write the index to `path`, replacing a previous index there.
    ///
    /// Tables are written into a staging directory beside `path` that is
    /// renamed into place only after every write succeeded. An existing
    /// `path` is only replaced when it holds an index or is empty.
    pub async fn persist(&self, path: &Path) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyIndex);
        }
        ensure_replaceable(path)?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        std::fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new().prefix(".index-staging-").tempdir_in(&parent)?;
        self.write_tables(staging.path())
            .await
            .map_err(|e| Error::Storage(format!("{:#}", e)))?;
        if path.exists() {
            warn!(path = %path.display(), "replacing existing index");
            std::fs::remove_dir_all(path)?;
        }
        std::fs::rename(staging.path(), path)?;
        info!(path = %path.display(), chunks = self.len(), dim = self.dim(), "index persisted");
        Ok(())
    }

    async fn write_tables(&self, dir: &Path) -> anyhow::Result<()> {
        let conn = open_db(&dir.to_string_lossy()).await?;
        create_table_with(&conn, CHUNKS_TABLE, self.to_record_batch()?).await?;
        let mut meta = vec![(KEY_DIM, self.dim().to_string()), (KEY_CHUNK_COUNT, self.len().to_string())];
        if let Some(m) = self.manifest() {
            meta.push((KEY_FINGERPRINT, m.fingerprint.clone()));
            meta.push((KEY_EMBEDDER_ID, m.embedder_id.clone()));
            meta.push((KEY_BUILT_AT, m.built_at.clone()));
        }
        write_meta(&conn, &meta).await?;
        debug!(dir = %dir.display(), "index tables written");
        Ok(())
    }

    fn to_record_batch(&self) -> anyhow::Result<RecordBatch> {
        let dim = i32::try_from(self.dim()).context("dimension does not fit the arrow schema")?;
        let entries = self.entries();
        let mut seq = Vec::with_capacity(entries.len());
        let mut contents = Vec::with_capacity(entries.len());
        let mut metadata = Vec::with_capacity(entries.len());
        let mut starts = Vec::with_capacity(entries.len());
        let mut ends = Vec::with_capacity(entries.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
        for e in entries {
            seq.push(i64::try_from(e.chunk.sequence_index)?);
            contents.push(e.chunk.text.clone());
            metadata.push(serde_json::to_string(&e.chunk.metadata)?);
            starts.push(i64::try_from(e.chunk.start)?);
            ends.push(i64::try_from(e.chunk.end)?);
            vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
        }
        Ok(RecordBatch::try_new(build_chunks_schema(dim), vec![
            Arc::new(Int64Array::from(seq)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(Int64Array::from(starts)),
            Arc::new(Int64Array::from(ends)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
        ])?)
    }

    /// Read an index written by [`VectorIndex::persist`]. Any unreadable or
    /// inconsistent content is reported as `CorruptIndex`.
    pub async fn load(path: &Path) -> Result<Self> {
        if !index_exists(path) {
            return Err(Error::CorruptIndex(format!("no index tables under {}", path.display())));
        }
        let index = read_index(path)
            .await
            .map_err(|e| Error::CorruptIndex(format!("{}: {:#}", path.display(), e)))?;
        info!(path = %path.display(), chunks = index.len(), dim = index.dim(), "index loaded");
        Ok(index)
    }
}

fn ensure_replaceable(path: &Path) -> Result<()> {
    if !path.exists() || index_exists(path) {
        return Ok(());
    }
    let empty_dir = path.is_dir() && std::fs::read_dir(path)?.next().is_none();
    if empty_dir {
        return Ok(());
    }
    Err(Error::Storage(format!("refusing to replace non-index path {}", path.display())))
}

async fn read_index(path: &Path) -> anyhow::Result<VectorIndex> {
    let conn = open_db(&path.to_string_lossy()).await?;
    let meta = read_meta(&conn).await?;
    let dim: usize = meta.get(KEY_DIM).ok_or_else(|| anyhow!("manifest has no dim"))?.parse()?;
    let chunk_count: usize = meta.get(KEY_CHUNK_COUNT).ok_or_else(|| anyhow!("manifest has no chunk_count"))?.parse()?;

    let mut entries = Vec::with_capacity(chunk_count);
    for batch in read_all(&conn, CHUNKS_TABLE).await? {
        entries.extend(batch_to_entries(&batch, dim)?);
    }
    if entries.len() != chunk_count {
        bail!("expected {} chunks, found {}", chunk_count, entries.len());
    }
    entries.sort_by_key(|e| e.chunk.sequence_index);

    let mut index = VectorIndex::build(entries)?;
    if index.dim() != dim {
        bail!("stored dim {} but vectors have {}", dim, index.dim());
    }
    if let (Some(fingerprint), Some(embedder_id)) = (meta.get(KEY_FINGERPRINT), meta.get(KEY_EMBEDDER_ID)) {
        index = index.with_manifest(IndexManifest {
            fingerprint: fingerprint.clone(),
            embedder_id: embedder_id.clone(),
            dim,
            chunk_count,
            built_at: meta.get(KEY_BUILT_AT).cloned().unwrap_or_default(),
        });
    }
    Ok(index)
}

fn batch_to_entries(batch: &RecordBatch, dim: usize) -> anyhow::Result<Vec<IndexedChunk>> {
    let seq = int_column(batch, "sequence_index")?;
    let contents = string_column(batch, "content")?;
    let metadata = string_column(batch, "metadata")?;
    let starts = int_column(batch, "start")?;
    let ends = int_column(batch, "end")?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| anyhow!("vector column missing or not a fixed size list"))?;
    if usize::try_from(vectors.value_length())? != dim {
        bail!("vector column width {} != dim {}", vectors.value_length(), dim);
    }

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if vectors.is_null(i) { bail!("row {} has no vector", i); }
        let values = vectors.value(i);
        let values = values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| anyhow!("vector items are not f32"))?;
        let meta: Meta = serde_json::from_str(metadata.value(i))?;
        out.push(IndexedChunk {
            chunk: Chunk {
                text: contents.value(i).to_string(),
                sequence_index: usize::try_from(seq.value(i))?,
                start: usize::try_from(starts.value(i))?,
                end: usize::try_from(ends.value(i))?,
                metadata: meta,
            },
            vector: values.values().to_vec(),
        });
    }
    Ok(out)
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| anyhow!("{} column missing or not int64", name))
}
