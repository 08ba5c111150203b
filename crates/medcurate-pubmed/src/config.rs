//! Parse stage configuration

use std::path::PathBuf;

/// Runtime configuration for the Medline → Parquet stage
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of `*.xml.gz` / `*.xml` Medline files
    pub input_dir: PathBuf,
    /// Output directory for parquet shards
    pub output_dir: PathBuf,
    /// Files parsed concurrently
    pub workers: usize,
    /// Zstd compression level for parquet output
    pub zstd_level: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("baseline"),
            output_dir: PathBuf::from("parquet"),
            workers: 1,
            zstd_level: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("parquet"));
        assert_eq!(config.workers, 1);
        assert_eq!(config.zstd_level, 3);
    }
}
