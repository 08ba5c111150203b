//! Status subcommand - shards done and remaining for a filter run

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use medcurate_core::fmt_num;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory of Parquet shards
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory of <shard_id>.json artifacts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// List the remaining shard ids
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let input = args
        .input
        .unwrap_or_else(|| config.filter.input_dir.clone());
    let output = args
        .output
        .unwrap_or_else(|| config.filter.output_dir.clone());

    let plan = medcurate_filter::plan(&input, &output)?;

    super::print_summary(
        "Status",
        &[
            ("Input", input.display().to_string()),
            ("Output", output.display().to_string()),
            ("Shards", fmt_num(plan.total)),
            ("Done", fmt_num(plan.done)),
            ("Remaining", fmt_num(plan.remaining.len())),
        ],
    );

    if args.list {
        for shard in &plan.remaining {
            println!("{}", shard.id);
        }
    }
    Ok(())
}
