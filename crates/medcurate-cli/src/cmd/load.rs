//! Load subcommand - insert filter artifacts into a DuckDB table

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Directory of <shard_id>.json artifacts
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Parquet shard directory the table columns are taken from
    #[arg(long)]
    pub parquet_dir: Option<PathBuf>,

    /// DuckDB database file
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Target table
    #[arg(short, long)]
    pub table: Option<String>,

    /// Fail instead of creating a missing table
    #[arg(long)]
    pub no_create: bool,
}

pub fn run(args: LoadArgs, config: &Config) -> Result<ExitCode> {
    let load_config = medcurate_load::LoadConfig {
        parquet_dir: args
            .parquet_dir
            .unwrap_or_else(|| config.parse.output_dir.clone()),
        json_dir: args
            .input
            .unwrap_or_else(|| config.filter.output_dir.clone()),
        database: Some(args.database.unwrap_or_else(|| config.load.database.clone())),
        table: args.table.unwrap_or_else(|| config.load.table.clone()),
        create_table: !args.no_create,
    };

    log::info!(
        "Loading {} into {}",
        load_config.json_dir.display(),
        load_config.table
    );

    let summary = medcurate_load::run(&load_config)?;
    eprintln!("{}", summary.format_table());
    summary.log();

    Ok(super::exit_code(!summary.is_clean()))
}
