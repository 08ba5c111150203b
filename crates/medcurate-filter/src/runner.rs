//! Pipeline driver for the filter stage

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use medcurate_core::pool::{self, JobError};
use medcurate_core::{ProgressContext, cleanup_tmp_files, fmt_num};

use crate::classify::{ShardStats, classify_shard};
use crate::config::Config;
use crate::error::FilterError;
use crate::ledger;
use crate::model::Classifier;
use crate::shard::{self, Shard};
use crate::stats::{ShardFailure, Summary};

/// Work for one run: every shard, and those still lacking an artifact
#[derive(Debug)]
pub struct Plan {
    pub total: usize,
    /// Shards with an artifact already present
    pub done: usize,
    pub remaining: Vec<Shard>,
}

/// Enumerate shards and subtract the completion ledger. No side effects.
pub fn plan(input_dir: &Path, output_dir: &Path) -> Result<Plan, FilterError> {
    if !input_dir.is_dir() {
        return Err(FilterError::Configuration(format!(
            "input directory {} does not exist",
            input_dir.display()
        )));
    }
    let all = shard::enumerate(input_dir)?;
    let done = ledger::completed(output_dir)?;
    let total = all.len();
    let (remaining, done) = ledger::remaining(all, &done);
    Ok(Plan {
        total,
        done,
        remaining,
    })
}

/// Run the filter stage, stopping submission on the global shutdown flag.
pub fn run(
    config: &Config,
    model: Arc<dyn Classifier>,
    progress: &ProgressContext,
) -> Result<Summary, FilterError> {
    run_until(
        config,
        model,
        progress,
        medcurate_core::shutdown::shutdown_flag(),
    )
}

/// [`run`] with an explicit stop flag.
///
/// Only configuration problems return `Err`; per-shard failures are listed in
/// the returned [`Summary`].
pub fn run_until(
    config: &Config,
    model: Arc<dyn Classifier>,
    progress: &ProgressContext,
    stop: &AtomicBool,
) -> Result<Summary, FilterError> {
    let start = Instant::now();
    config.validate()?;

    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir).map_err(|e| {
        FilterError::Configuration(format!(
            "cannot create output directory {}: {e}",
            output_dir.display()
        ))
    })?;

    let removed = cleanup_tmp_files(output_dir).map_err(|e| FilterError::io(output_dir, e))?;
    if removed > 0 {
        log::info!("Removed {removed} stale tmp files from {}", output_dir.display());
    }

    let plan = plan(&config.input_dir, output_dir)?;
    log::info!(
        "{} shards: {} done, {} remaining ({} workers)",
        fmt_num(plan.total),
        fmt_num(plan.done),
        fmt_num(plan.remaining.len()),
        config.workers
    );

    let mut summary = Summary {
        total: plan.total,
        skipped: plan.done,
        ..Default::default()
    };
    if plan.remaining.is_empty() {
        summary.elapsed = start.elapsed();
        return Ok(summary);
    }

    let pb = progress.run_bar("filter", plan.remaining.len());
    let opts = &config.classify;

    let report = pool::run_until(
        plan.remaining,
        config.workers,
        stop,
        |shard: &Shard| classify_shard(shard, model.as_ref(), output_dir, opts),
        |shard, result: &Result<ShardStats, JobError<FilterError>>| {
            pb.inc(1);
            match result {
                Ok(stats) => {
                    pb.set_message(shard.id.clone());
                    if !progress.is_tty() {
                        log::info!(
                            "{}: {} / {} accepted [{:.1}s]",
                            shard.id,
                            fmt_num(stats.accepted),
                            fmt_num(stats.scored),
                            stats.elapsed.as_secs_f64()
                        );
                    }
                }
                Err(e) => log::warn!("Shard {} failed: {e}", shard.id),
            }
        },
    )
    .map_err(|e| FilterError::WorkerPool(format!("cannot start worker threads: {e}")))?;
    pb.finish_and_clear();

    summary.submitted = report.submitted();
    summary.not_started = report.not_started.len();
    for (_, stats) in &report.completed {
        summary.add_shard(stats);
    }
    summary.failures = report
        .failed
        .into_iter()
        .map(|(shard, e)| ShardFailure {
            id: shard.id,
            error: match e {
                JobError::Failed(e) => e,
                JobError::Panicked(msg) => FilterError::WorkerPool(msg),
            },
        })
        .collect();
    summary.elapsed = start.elapsed();
    Ok(summary)
}
