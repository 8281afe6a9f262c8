//! LanceDB connection and housekeeping helpers.
//!
//! Provides database open, whole-table create/read helpers, and a simple
//! key/value metadata table holding the index manifest.

use anyhow::{anyhow, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::collections::HashMap;
use std::sync::Arc;

use crate::schema::{build_meta_schema, META_TABLE};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// Create `name` holding exactly `batch`.
pub async fn create_table_with(conn: &Connection, name: &str, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    conn.create_table(name, reader).execute().await?;
    Ok(())
}

/// Every row of `name`. Queries default to a row limit, so the limit is set
/// to the table's row count.
pub async fn read_all(conn: &Connection, name: &str) -> Result<Vec<RecordBatch>> {
    let table = conn.open_table(name).execute().await?;
    let rows = table.count_rows(None).await?;
    if rows == 0 { return Ok(Vec::new()); }
    let mut stream = table.query().limit(rows).execute().await?;
    let mut batches = Vec::new();
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        batches.push(batch);
    }
    Ok(batches)
}

pub async fn write_meta(conn: &Connection, entries: &[(&str, String)]) -> Result<()> {
    let now = Utc::now().timestamp_millis();
    let batch = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(entries.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(entries.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>())),
            Arc::new(TimestampMillisecondArray::from(vec![now; entries.len()])),
        ],
    )?;
    create_table_with(conn, META_TABLE, batch).await
}

pub async fn read_meta(conn: &Connection) -> Result<HashMap<String, String>> {
    let mut meta = HashMap::new();
    if !has_table(conn, META_TABLE).await? { return Ok(meta); }
    for batch in read_all(conn, META_TABLE).await? {
        let keys = string_column(&batch, "key")?;
        let values = string_column(&batch, "value")?;
        for i in 0..batch.num_rows() {
            meta.insert(keys.value(i).to_string(), values.value(i).to_string());
        }
    }
    Ok(meta)
}

pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{} column missing or not utf8", name))
}
