//! medcurate - curation pipeline for PubMed abstracts
//!
//! Parses Medline XML into Parquet shards, classifies the shards into
//! per-shard JSON artifacts, and loads the accepted records into DuckDB.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "medcurate")]
#[command(about = "Resumable classification pipeline for PubMed abstracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Show info logs even with progress bars
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: ./medcurate.toml or ~/.config/medcurate/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse Medline XML files into Parquet shards
    Parse(cmd::parse::ParseArgs),
    /// Classify Parquet shards and keep the accepted records
    Filter(cmd::filter::FilterArgs),
    /// Insert filtered records into a DuckDB table
    Load(cmd::load::LoadArgs),
    /// Show how many shards are done and remaining
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let progress = Arc::new(medcurate_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug/--verbose, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug && !cli.verbose;
    medcurate_core::init_logging(quiet, cli.debug, multi);

    medcurate_core::install_signal_handlers().context("Failed to install signal handlers")?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Parse(args) => cmd::parse::run(args, &config, &progress),
        Command::Filter(args) => cmd::filter::run(args, &config, &progress),
        Command::Load(args) => cmd::load::run(args, &config),
        Command::Status(args) => {
            cmd::status::run(args, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            cmd::config::run(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}
