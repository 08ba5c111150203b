//! Main runner for the parse stage

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use medcurate_core::pool::{self, JobError};
use medcurate_core::{ProgressContext, cleanup_tmp_files, fmt_num, is_valid_parquet};
use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::worker::{self, InputFile};

/// Parse stage execution summary
#[derive(Debug, Default)]
pub struct Summary {
    pub total_files: usize,
    /// Inputs whose shard already exists
    pub skipped_files: usize,
    pub completed_files: usize,
    /// File name and reason for every input that produced no shard
    pub failed: Vec<(String, String)>,
    pub not_started: usize,
    pub total_articles: usize,
    pub elapsed: std::time::Duration,
}

impl Summary {
    pub fn failed_files(&self) -> usize {
        self.failed.len()
    }

    /// Log summary lines
    pub fn log(&self) {
        log::info!("=== Parse Summary ===");
        log::info!(
            "Files: {}/{} completed ({} skipped, {} failed)",
            self.completed_files,
            self.total_files,
            self.skipped_files,
            self.failed_files()
        );
        if self.not_started > 0 {
            log::warn!("Not started (shutdown): {}", self.not_started);
        }
        log::info!("Articles: {}", fmt_num(self.total_articles));
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());

        if self.total_articles > 0 {
            let rate = self.total_articles as f64 / self.elapsed.as_secs_f64();
            log::info!("Throughput: {:.0} articles/sec", rate);
        }
    }
}

/// Medline inputs directly under `dir`, sorted by file name
pub fn discover(dir: &Path) -> Result<Vec<InputFile>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(input) = InputFile::from_path(&path) {
            inputs.push(input);
        }
    }
    inputs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(inputs)
}

/// Run the parse stage, stopping submission on the global shutdown flag
pub fn run(config: &Config, progress: &ProgressContext) -> Result<Summary> {
    run_until(config, progress, medcurate_core::shutdown::shutdown_flag())
}

/// [`run`] with an explicit stop flag
pub fn run_until(
    config: &Config,
    progress: &ProgressContext,
    stop: &AtomicBool,
) -> Result<Summary> {
    let start = Instant::now();

    if !config.input_dir.is_dir() {
        bail!(
            "input directory {} does not exist",
            config.input_dir.display()
        );
    }
    std::fs::create_dir_all(&config.output_dir).context("Failed to create output directory")?;
    cleanup_tmp_files(&config.output_dir).context("Failed to clean stale tmp files")?;

    let inputs = discover(&config.input_dir)?;
    let total_files = inputs.len();

    {
        let mut stems = FxHashSet::default();
        for input in &inputs {
            if !stems.insert(input.stem.as_str()) {
                bail!("two inputs map to shard {}.parquet", input.stem);
            }
        }
    }

    let (done, remaining): (Vec<InputFile>, Vec<InputFile>) = inputs
        .into_iter()
        .partition(|input| is_valid_parquet(&input.output_path(&config.output_dir)));

    log::info!(
        "Processing {} files with {} workers ({} already parsed)",
        remaining.len(),
        config.workers,
        done.len()
    );

    let pb = progress.run_bar("parse", remaining.len());
    let report = pool::run_until(
        remaining,
        config.workers,
        stop,
        |input: &InputFile| worker::process_file(input, &config.output_dir, config.zstd_level),
        |input, result: &Result<usize, JobError<anyhow::Error>>| {
            pb.inc(1);
            match result {
                Ok(count) => log::debug!("{}: {} articles", input.stem, count),
                Err(e) => log::warn!(
                    "{} is corrupt and could not be parsed: {e:#}",
                    input.path.display()
                ),
            }
        },
    )
    .context("Failed to create thread pool")?;
    pb.finish_and_clear();

    let summary = Summary {
        total_files,
        skipped_files: done.len(),
        completed_files: report.completed.len(),
        failed: report
            .failed
            .iter()
            .map(|(input, e)| (input.stem.clone(), format!("{e:#}")))
            .collect(),
        not_started: report.not_started.len(),
        total_articles: report.completed.iter().map(|(_, n)| n).sum(),
        elapsed: start.elapsed(),
    };
    summary.log();
    Ok(summary)
}
