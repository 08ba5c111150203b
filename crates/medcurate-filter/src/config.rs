//! Filter stage configuration

use std::path::PathBuf;

use crate::classify::ClassifyOptions;
use crate::error::FilterError;

/// Runtime configuration for one filter run
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of Parquet shards
    pub input_dir: PathBuf,
    /// Directory receiving `<shard_id>.json` artifacts
    pub output_dir: PathBuf,
    /// Maximum shards classified concurrently
    pub workers: usize,
    pub classify: ClassifyOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("parquet"),
            output_dir: PathBuf::from("filtered"),
            workers: 1,
            classify: ClassifyOptions::default(),
        }
    }
}

impl Config {
    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.workers == 0 {
            return Err(FilterError::Configuration(
                "workers must be at least 1".to_string(),
            ));
        }
        let t = self.classify.threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(FilterError::Configuration(format!(
                "threshold {t} is outside [0, 1]"
            )));
        }
        if self.classify.max_accepted == Some(0) {
            return Err(FilterError::Configuration(
                "max_accepted must be positive (omit it for no cap)".to_string(),
            ));
        }
        if self.classify.key_column.is_empty() || self.classify.text_column.is_empty() {
            return Err(FilterError::Configuration(
                "key and text column names must not be empty".to_string(),
            ));
        }
        if self.input_dir == self.output_dir {
            return Err(FilterError::Configuration(format!(
                "input and output directory are both {}",
                self.input_dir.display()
            )));
        }
        Ok(())
    }
}
