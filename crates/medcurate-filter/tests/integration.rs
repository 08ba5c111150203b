//! End-to-end tests for the filter stage over real Parquet shards

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use arrow::array::{Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use medcurate_core::ProgressContext;
use medcurate_filter::runner::run_until;
use medcurate_filter::{Classifier, Config, FilterError, ModelError, Summary, ledger};
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value};
use tempfile::TempDir;

struct Dirs {
    _tmp: TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn dirs() -> Dirs {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("parquet");
    let output = tmp.path().join("filtered");
    fs::create_dir_all(&input).unwrap();
    Dirs {
        _tmp: tmp,
        input,
        output,
    }
}

/// Write `<id>.parquet` with pmid/title/abstract columns
fn write_shard(dir: &Path, id: &str, abstracts: &[Option<&str>]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("pmid", DataType::Int64, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("abstract", DataType::Utf8, true),
    ]));
    let n = abstracts.len() as i64;
    let titles: Vec<Option<String>> = (0..n).map(|i| Some(format!("Title {i}"))).collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from((1..=n).collect::<Vec<_>>())),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(abstracts.to_vec())),
        ],
    )
    .unwrap();
    let file = File::create(dir.join(format!("{id}.parquet"))).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn config(d: &Dirs, workers: usize) -> Config {
    Config {
        input_dir: d.input.clone(),
        output_dir: d.output.clone(),
        workers,
        ..Default::default()
    }
}

fn run(config: &Config, model: Arc<dyn Classifier>) -> Summary {
    run_until(
        config,
        model,
        &ProgressContext::with_tty(false),
        &AtomicBool::new(false),
    )
    .unwrap()
}

fn read_artifact(path: &Path) -> Map<String, Value> {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

/// Scores 0.9 for texts mentioning "pet", 0.1 otherwise
fn keyword_model() -> Arc<dyn Classifier> {
    Arc::new(|t: &str| if t.contains("pet") { 0.9 } else { 0.1 })
}

#[test]
fn writes_one_artifact_per_shard() {
    let d = dirs();
    write_shard(
        &d.input,
        "0001",
        &[
            Some("PET imaging of the brain."),
            Some("Dietary fibre and gut health."),
            None,
        ],
    );
    write_shard(&d.input, "0002", &[Some("Cardiac PET perfusion study.")]);

    let summary = run(&config(&d, 2), keyword_model());
    assert_eq!(summary.total, 2);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.records_read, 4);
    assert_eq!(summary.records_scored, 3);
    assert_eq!(summary.records_accepted, 2);
    assert!(summary.is_clean());

    let first = read_artifact(&d.output.join("0001.json"));
    assert_eq!(first.len(), 1);
    let record = &first["1"];
    assert_eq!(record["pmid"], 1);
    assert_eq!(record["title"], "Title 0");
    assert_eq!(record["abstract"], "PET imaging of the brain.");
    assert_eq!(record["class_value"], 0.9);
}

#[test]
fn second_run_submits_nothing() {
    let d = dirs();
    for id in ["0001", "0002", "0003"] {
        write_shard(&d.input, id, &[Some("PET imaging of the brain.")]);
    }
    let config = config(&d, 2);

    let first = run(&config, keyword_model());
    assert_eq!(first.submitted, 3);

    let before = fs::read(d.output.join("0002.json")).unwrap();
    let second = run(&config, keyword_model());
    assert_eq!(second.submitted, 0);
    assert_eq!(second.skipped, second.total);
    assert_eq!(fs::read(d.output.join("0002.json")).unwrap(), before);
}

#[test]
fn threshold_boundary_is_strict() {
    let d = dirs();
    write_shard(
        &d.input,
        "0001",
        &[Some("scored exactly half"), Some("scored just above half")],
    );
    let model: Arc<dyn Classifier> =
        Arc::new(|t: &str| if t.contains("exactly") { 0.50 } else { 0.51 });

    run(&config(&d, 1), model);
    let artifact = read_artifact(&d.output.join("0001.json"));
    let keys: Vec<&str> = artifact.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["2"]);
}

#[test]
fn cap_writes_first_n_accepted() {
    let d = dirs();
    write_shard(
        &d.input,
        "0001",
        &[
            Some("PET study number one"),
            Some("PET study number two"),
            Some("PET study number three"),
            Some("PET study number four"),
            Some("PET study number five"),
        ],
    );
    let mut config = config(&d, 1);
    config.classify.max_accepted = Some(2);

    let summary = run(&config, keyword_model());
    assert_eq!(summary.records_accepted, 2);
    assert_eq!(summary.capped_shards, 1);

    let artifact = read_artifact(&d.output.join("0001.json"));
    let keys: Vec<&str> = artifact.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["1", "2"]);
}

/// Counts concurrent `score` calls
struct Instrumented {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Classifier for Instrumented {
    fn score(&self, _text: &str) -> Result<f64, ModelError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(30));
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(0.9)
    }
}

#[test]
fn concurrency_never_exceeds_workers() {
    let d = dirs();
    for i in 0..10 {
        write_shard(
            &d.input,
            &format!("{i:04}"),
            &[Some("PET imaging of the brain."), Some("PET imaging of the heart.")],
        );
    }
    let model = Arc::new(Instrumented {
        active: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });

    let summary = run(&config(&d, 3), model.clone());
    assert_eq!(summary.completed, 10);
    let peak = model.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak} exceeds 3");
    assert!(peak >= 1);
}

#[test]
fn corrupt_shard_fails_alone_and_is_retried() {
    let d = dirs();
    write_shard(&d.input, "A", &[Some("PET imaging of the brain.")]);
    fs::write(d.input.join("B.parquet"), b"PAR1 definitely not parquet").unwrap();
    write_shard(&d.input, "C", &[Some("PET imaging of the heart.")]);
    let config = config(&d, 2);

    let summary = run(&config, keyword_model());
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].id, "B");
    assert!(matches!(
        summary.failures[0].error,
        FilterError::DataFormat { .. }
    ));
    assert!(d.output.join("A.json").exists());
    assert!(d.output.join("C.json").exists());
    assert!(!d.output.join("B.json").exists());

    let retry = run(&config, keyword_model());
    assert_eq!(retry.skipped, 2);
    assert_eq!(retry.submitted, 1);
    assert_eq!(retry.failures[0].id, "B");
}

#[test]
fn panicking_model_is_reported_as_worker_failure() {
    let d = dirs();
    write_shard(&d.input, "0001", &[Some("PET imaging of the brain.")]);
    write_shard(&d.input, "0002", &[Some("the word that kills")]);
    let model: Arc<dyn Classifier> = Arc::new(|t: &str| {
        if t.contains("kills") {
            panic!("model crashed");
        }
        0.9
    });

    let summary = run(&config(&d, 2), model);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].id, "0002");
    assert!(matches!(
        summary.failures[0].error,
        FilterError::WorkerPool(_)
    ));
    assert!(!d.output.join("0002.json").exists());
}

#[test]
fn leftover_tmp_is_not_done_and_gets_cleaned() {
    let d = dirs();
    write_shard(&d.input, "D", &[Some("PET imaging of the brain.")]);
    fs::create_dir_all(&d.output).unwrap();
    let tmp = d.output.join("D.json.tmp");
    fs::write(&tmp, b"{\"1\": {\"pmid\": 1, \"abs").unwrap();

    assert!(ledger::completed(&d.output).unwrap().is_empty());

    let summary = run(&config(&d, 1), keyword_model());
    assert_eq!(summary.submitted, 1);
    assert!(!tmp.exists());
    assert_eq!(read_artifact(&d.output.join("D.json")).len(), 1);
}

#[test]
fn shutdown_flag_leaves_shards_for_next_run() {
    let d = dirs();
    for id in ["0001", "0002"] {
        write_shard(&d.input, id, &[Some("PET imaging of the brain.")]);
    }
    let config = config(&d, 1);

    let summary = run_until(
        &config,
        keyword_model(),
        &ProgressContext::with_tty(false),
        &AtomicBool::new(true),
    )
    .unwrap();
    assert_eq!(summary.submitted, 0);
    assert_eq!(summary.not_started, 2);
    assert!(!summary.is_clean());

    let resumed = run(&config, keyword_model());
    assert_eq!(resumed.completed, 2);
}
