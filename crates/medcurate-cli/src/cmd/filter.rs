//! Filter subcommand - classify Parquet shards into per-shard JSON artifacts

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use medcurate_core::SharedProgress;
use medcurate_filter::{Classifier, ClassifyOptions, LexiconModel};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Directory of Parquet shards
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory for <shard_id>.json artifacts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Classifier model file (JSON lexicon)
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Number of shards classified concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Stop a shard after this many accepted records (0 = unbounded)
    #[arg(long)]
    pub max_accepted: Option<usize>,

    /// Records scoring strictly above this are accepted
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Column identifying a record
    #[arg(long)]
    pub key_column: Option<String>,

    /// Column holding the text to classify
    #[arg(long)]
    pub text_column: Option<String>,
}

impl FilterArgs {
    /// Merge with config file values; flags win
    fn resolve(self, config: &Config) -> Result<(medcurate_filter::Config, PathBuf)> {
        let file = &config.filter;
        let model = self
            .model
            .or_else(|| file.model.clone())
            .context("no classifier model given (use --model or [filter] model)")?;
        let max_accepted = self.max_accepted.unwrap_or(file.max_accepted);

        let filter_config = medcurate_filter::Config {
            input_dir: self.input.unwrap_or_else(|| file.input_dir.clone()),
            output_dir: self.output.unwrap_or_else(|| file.output_dir.clone()),
            workers: config.workers.resolve(self.workers),
            classify: ClassifyOptions {
                threshold: self.threshold.unwrap_or(file.threshold),
                max_accepted: (max_accepted > 0).then_some(max_accepted),
                key_column: self.key_column.unwrap_or_else(|| file.key_column.clone()),
                text_column: self
                    .text_column
                    .unwrap_or_else(|| file.text_column.clone()),
            },
        };
        Ok((filter_config, model))
    }
}

pub fn run(args: FilterArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let (filter_config, model_path) = args.resolve(config)?;
    filter_config.validate()?;

    let model = LexiconModel::load(&model_path)?;
    log::info!("Filtering for `{}`", model.label());
    log::info!("  Input: {}", filter_config.input_dir.display());
    log::info!("  Output: {}", filter_config.output_dir.display());
    log::info!(
        "  Threshold: {} | Workers: {} | Max accepted: {}",
        filter_config.classify.threshold,
        filter_config.workers,
        filter_config
            .classify
            .max_accepted
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );
    let model: Arc<dyn Classifier> = Arc::new(model);

    let summary = medcurate_filter::run(&filter_config, model, progress)?;

    if progress.is_tty() {
        summary.print();
    } else {
        summary.log();
    }

    Ok(super::exit_code(!summary.is_clean()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> FilterArgs {
        FilterArgs {
            input: None,
            output: None,
            model: Some(PathBuf::from("model.json")),
            workers: None,
            max_accepted: None,
            threshold: None,
            key_column: None,
            text_column: None,
        }
    }

    #[test]
    fn zero_max_accepted_is_unbounded() {
        let (config, _) = FilterArgs {
            max_accepted: Some(0),
            ..args()
        }
        .resolve(&Config::default())
        .unwrap();
        assert_eq!(config.classify.max_accepted, None);

        let (config, _) = FilterArgs {
            max_accepted: Some(25),
            ..args()
        }
        .resolve(&Config::default())
        .unwrap();
        assert_eq!(config.classify.max_accepted, Some(25));
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = Config::default();
        file.filter.threshold = 0.7;
        file.filter.text_column = "title".to_string();

        let (config, model) = FilterArgs {
            threshold: Some(0.9),
            ..args()
        }
        .resolve(&file)
        .unwrap();
        assert_eq!(config.classify.threshold, 0.9);
        assert_eq!(config.classify.text_column, "title");
        assert_eq!(model, PathBuf::from("model.json"));
    }

    #[test]
    fn model_is_required() {
        let result = FilterArgs {
            model: None,
            ..args()
        }
        .resolve(&Config::default());
        assert!(result.is_err());
    }
}
