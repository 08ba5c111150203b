//! Per-shard worker: read, normalize, score, keep, write one artifact

use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::error::FilterError;
use crate::model::Classifier;
use crate::record::ShardReader;
use crate::shard::Shard;
use crate::text::{is_classifiable, normalize};

/// Acceptance settings shared by every shard of a run
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Records are kept when `score > threshold`
    pub threshold: f64,
    /// Stop a shard once this many records are accepted
    pub max_accepted: Option<usize>,
    pub key_column: String,
    pub text_column: String,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_accepted: None,
            key_column: "pmid".to_string(),
            text_column: "abstract".to_string(),
        }
    }
}

impl ClassifyOptions {
    fn cap_reached(&self, accepted: usize) -> bool {
        self.max_accepted.is_some_and(|max| accepted >= max)
    }
}

/// What happened inside one shard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardStats {
    pub records_read: usize,
    /// Null or too-short text
    pub skipped: usize,
    pub scored: usize,
    /// Acceptances, including repeats of a key already in the artifact
    pub accepted: usize,
    /// Processing stopped early on `max_accepted`
    pub capped: bool,
    pub elapsed: Duration,
}

/// Classify one shard and write `<output_dir>/<id>.json`.
///
/// The artifact is a JSON object mapping record key to the full record with
/// its `class_value`, in source order. It only appears under its final name
/// once completely written; on any error no artifact exists for the shard.
pub fn classify_shard(
    shard: &Shard,
    model: &dyn Classifier,
    output_dir: &Path,
    opts: &ClassifyOptions,
) -> Result<ShardStats, FilterError> {
    let start = Instant::now();
    let mut stats = ShardStats::default();
    let mut accepted = Map::new();

    let mut reader = ShardReader::open(&shard.source_path, &opts.key_column, &opts.text_column)?;

    'shard: while let Some(records) = reader.next_records() {
        for mut record in records? {
            stats.records_read += 1;

            let Some(raw) = record.text(&opts.text_column).filter(|t| is_classifiable(t)) else {
                stats.skipped += 1;
                continue;
            };

            let score = model.score(&normalize(raw))?;
            stats.scored += 1;

            if score > opts.threshold {
                record.class_value = score;
                let key = std::mem::take(&mut record.key);
                let value = serde_json::to_value(&record)
                    .map_err(|e| FilterError::data(&shard.source_path, e))?;
                if accepted.insert(key.clone(), value).is_some() {
                    log::debug!("{}: duplicate key {key}, keeping last", shard.id);
                }
                stats.accepted += 1;

                if opts.cap_reached(stats.accepted) {
                    stats.capped = true;
                    break 'shard;
                }
            }
        }
    }

    let artifact = shard.artifact_path(output_dir);
    medcurate_core::write_json_atomic(&artifact, &Value::Object(accepted))
        .map_err(|e| FilterError::io(&artifact, e))?;

    stats.elapsed = start.elapsed();
    log::debug!(
        "{}: {} read, {} scored, {} accepted{}",
        shard.id,
        stats.records_read,
        stats.scored,
        stats.accepted,
        if stats.capped { " (capped)" } else { "" }
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::sync::Arc;

    use arrow::array::{RecordBatch, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    fn write_shard(dir: &Path, id: &str, rows: &[(&str, Option<&str>)]) -> Shard {
        let schema = Arc::new(Schema::new(vec![
            Field::new("pmid", DataType::Utf8, false),
            Field::new("abstract", DataType::Utf8, true),
        ]));
        let pmids: Vec<&str> = rows.iter().map(|(k, _)| *k).collect();
        let texts: Vec<Option<&str>> = rows.iter().map(|(_, t)| *t).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(pmids)),
                Arc::new(StringArray::from(texts)),
            ],
        )
        .unwrap();

        let path = dir.join(format!("{id}.parquet"));
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        Shard {
            id: id.to_string(),
            source_path: path,
        }
    }

    fn read_artifact(path: &Path) -> Map<String, Value> {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn threshold_is_strict() {
        let dir = TempDir::new().unwrap();
        let shard = write_shard(
            dir.path(),
            "0001",
            &[("1", Some("exactly at the threshold")), ("2", Some("strictly above the threshold"))],
        );
        let model = |t: &str| if t.starts_with("exactly") { 0.5 } else { 0.5000001 };

        let stats =
            classify_shard(&shard, &model, dir.path(), &ClassifyOptions::default()).unwrap();
        assert_eq!(stats.scored, 2);
        assert_eq!(stats.accepted, 1);

        let artifact = read_artifact(&shard.artifact_path(dir.path()));
        assert!(artifact.contains_key("2"));
        assert!(!artifact.contains_key("1"));
        assert_eq!(artifact["2"]["class_value"], 0.5000001);
    }

    #[test]
    fn short_and_null_texts_are_skipped() {
        let dir = TempDir::new().unwrap();
        let shard = write_shard(
            dir.path(),
            "0001",
            &[("1", None), ("2", Some("too short")), ("3", Some("long enough to score"))],
        );
        let stats = classify_shard(&shard, &|_: &str| 0.9, dir.path(), &ClassifyOptions::default())
            .unwrap();
        assert_eq!(stats.records_read, 3);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.scored, 1);
    }

    #[test]
    fn model_sees_normalized_text() {
        let dir = TempDir::new().unwrap();
        let shard = write_shard(dir.path(), "0001", &[("1", Some("  Tc-99m (50%) Uptake.\n"))]);
        let model = |t: &str| if t == "tc-99m (50%) uptake" { 1.0 } else { 0.0 };
        let stats =
            classify_shard(&shard, &model, dir.path(), &ClassifyOptions::default()).unwrap();
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn cap_keeps_first_accepted_in_order() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<(String, String)> = (1..=5)
            .map(|i| (i.to_string(), format!("relevant abstract {i}")))
            .collect();
        let rows: Vec<(&str, Option<&str>)> =
            rows.iter().map(|(k, t)| (k.as_str(), Some(t.as_str()))).collect();
        let shard = write_shard(dir.path(), "0001", &rows);
        let opts = ClassifyOptions {
            max_accepted: Some(2),
            ..Default::default()
        };

        let stats = classify_shard(&shard, &|_: &str| 0.9, dir.path(), &opts).unwrap();
        assert!(stats.capped);
        assert_eq!(stats.scored, 2);

        let artifact = read_artifact(&shard.artifact_path(dir.path()));
        let keys: Vec<&str> = artifact.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1", "2"]);
    }

    #[test]
    fn cap_counts_repeated_keys() {
        let dir = TempDir::new().unwrap();
        let shard = write_shard(
            dir.path(),
            "0001",
            &[
                ("1", Some("first relevant abstract")),
                ("1", Some("same pmid printed twice")),
                ("2", Some("second relevant abstract")),
                ("3", Some("third relevant abstract")),
            ],
        );
        let opts = ClassifyOptions {
            max_accepted: Some(2),
            ..Default::default()
        };

        let stats = classify_shard(&shard, &|_: &str| 0.9, dir.path(), &opts).unwrap();
        assert!(stats.capped);
        assert_eq!(stats.scored, 2);
        assert_eq!(stats.accepted, 2);

        let artifact = read_artifact(&shard.artifact_path(dir.path()));
        let keys: Vec<&str> = artifact.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["1"]);
    }

    #[test]
    fn empty_result_still_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let shard = write_shard(dir.path(), "0001", &[("1", Some("not relevant at all"))]);
        let stats = classify_shard(&shard, &|_: &str| 0.1, dir.path(), &ClassifyOptions::default())
            .unwrap();
        assert_eq!(stats.accepted, 0);
        assert!(read_artifact(&shard.artifact_path(dir.path())).is_empty());
    }

    #[test]
    fn missing_text_column_is_data_error() {
        let dir = TempDir::new().unwrap();
        let shard = write_shard(dir.path(), "0001", &[("1", Some("long enough to score"))]);
        let opts = ClassifyOptions {
            text_column: "body".to_string(),
            ..Default::default()
        };
        let err = classify_shard(&shard, &|_: &str| 0.9, dir.path(), &opts).unwrap_err();
        assert!(matches!(err, FilterError::DataFormat { .. }));
        assert!(!shard.artifact_path(dir.path()).exists());
    }

    #[test]
    fn model_error_leaves_no_artifact() {
        struct Broken;
        impl Classifier for Broken {
            fn score(&self, _: &str) -> Result<f64, crate::model::ModelError> {
                Err(crate::model::ModelError::Inference("boom".into()))
            }
        }

        let dir = TempDir::new().unwrap();
        let shard = write_shard(dir.path(), "0001", &[("1", Some("long enough to score"))]);
        let err = classify_shard(&shard, &Broken, dir.path(), &ClassifyOptions::default())
            .unwrap_err();
        assert!(matches!(err, FilterError::Model(_)));
        assert!(!shard.artifact_path(dir.path()).exists());
    }
}
