//! Shard records: Parquet rows as uniformly shaped JSON objects
//!
//! Every column of the shard's schema is present in every record; null cells
//! stay as explicit `null`, so records of one shard never differ in shape.

use std::fs::File;
use std::path::Path;

use arrow::array::RecordBatch;
use arrow::json::WriterBuilder;
use arrow::json::writer::JsonArray;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FilterError;

/// Column written with the classification score
pub const CLASS_VALUE: &str = "class_value";

/// One row of a shard
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Unique key (PMID); serialized as the artifact map key, not a field
    #[serde(skip)]
    pub key: String,
    /// All source columns in schema order
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub class_value: f64,
}

impl Record {
    /// String value of `column`, `None` for null or non-string cells
    pub fn text(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(Value::as_str)
    }
}

/// Streams one shard's rows batch by batch
pub struct ShardReader {
    path: std::path::PathBuf,
    batches: ParquetRecordBatchReader,
    key_column: String,
}

impl std::fmt::Debug for ShardReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardReader")
            .field("path", &self.path)
            .field("key_column", &self.key_column)
            .finish_non_exhaustive()
    }
}

impl ShardReader {
    /// Open a Parquet shard and check the key and text columns exist
    pub fn open(path: &Path, key_column: &str, text_column: &str) -> Result<Self, FilterError> {
        let file = File::open(path).map_err(|e| FilterError::io(path, e))?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| FilterError::data(path, e))?;

        let schema = builder.schema().clone();
        for column in [key_column, text_column] {
            if schema.field_with_name(column).is_err() {
                return Err(FilterError::data(path, format!("missing column `{column}`")));
            }
        }

        let batches = builder.build().map_err(|e| FilterError::data(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            batches,
            key_column: key_column.to_string(),
        })
    }

    /// Next batch of records in source order, `None` at end of shard
    pub fn next_records(&mut self) -> Option<Result<Vec<Record>, FilterError>> {
        let batch = match self.batches.next()? {
            Ok(batch) => batch,
            Err(e) => return Some(Err(FilterError::data(&self.path, e))),
        };
        Some(
            batch_to_records(&batch, &self.key_column)
                .map_err(|e| FilterError::data(&self.path, e)),
        )
    }
}

/// Convert one batch to records. Rows with a null key are dropped.
pub fn batch_to_records(batch: &RecordBatch, key_column: &str) -> Result<Vec<Record>, String> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    writer.write(batch).map_err(|e| e.to_string())?;
    writer.finish().map_err(|e| e.to_string())?;
    let rows: Vec<Map<String, Value>> =
        serde_json::from_slice(&writer.into_inner()).map_err(|e| e.to_string())?;

    let mut records = Vec::with_capacity(rows.len());
    for mut fields in rows {
        let key = match fields.get(key_column) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | None => {
                log::debug!("Dropping row without `{key_column}`");
                continue;
            }
            Some(other) => return Err(format!("unsupported key value {other}")),
        };
        // A stale score from an earlier pass must not shadow the new one
        fields.remove(CLASS_VALUE);
        records.push(Record {
            key,
            fields,
            class_value: 0.0,
        });
    }
    Ok(records)
}
