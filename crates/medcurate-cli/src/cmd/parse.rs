//! Parse subcommand - Medline XML into Parquet shards

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use medcurate_core::{SharedProgress, fmt_num};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Directory of *.xml.gz / *.xml Medline files
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory for Parquet shards
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Zstd compression level (1-22)
    #[arg(short, long)]
    pub zstd_level: Option<i32>,
}

pub fn run(args: ParseArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let pm_config = medcurate_pubmed::Config {
        input_dir: args.input.unwrap_or_else(|| config.parse.input_dir.clone()),
        output_dir: args.output.unwrap_or_else(|| config.parse.output_dir.clone()),
        workers: config.workers.resolve(args.workers),
        zstd_level: args.zstd_level.unwrap_or(config.parse.zstd_level),
    };

    log::info!("Parsing Medline files");
    log::info!("  Input: {}", pm_config.input_dir.display());
    log::info!("  Output: {}", pm_config.output_dir.display());

    let summary = medcurate_pubmed::run(&pm_config, progress)?;

    if progress.is_tty() {
        super::print_summary(
            "Parse",
            &[
                (
                    "Files",
                    format!(
                        "{}/{} ({} skipped, {} failed)",
                        summary.completed_files,
                        summary.total_files,
                        summary.skipped_files,
                        summary.failed_files()
                    ),
                ),
                ("Articles", fmt_num(summary.total_articles)),
                ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
            ],
        );
        for (file, reason) in &summary.failed {
            eprintln!("  {file}: {reason}");
        }
    } else {
        summary.log();
    }

    Ok(super::exit_code(summary.failed_files() > 0))
}
