//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for medcurate
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub workers: WorkersConfig,
    pub parse: ParseConfig,
    pub filter: FilterConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            default: 1,
            max: 16,
        }
    }
}

impl WorkersConfig {
    /// CLI value or config default, clamped to `max`
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        let workers = requested.unwrap_or(self.default);
        if workers > self.max {
            log::warn!("{workers} workers requested, capping at {}", self.max);
            return self.max;
        }
        workers
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub zstd_level: i32,
}

impl Default for ParseConfig {
    fn default() -> Self {
        let defaults = medcurate_pubmed::Config::default();
        Self {
            input_dir: defaults.input_dir,
            output_dir: defaults.output_dir,
            zstd_level: defaults.zstd_level,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub model: Option<PathBuf>,
    pub threshold: f64,
    /// 0 means unbounded
    pub max_accepted: usize,
    pub key_column: String,
    pub text_column: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let defaults = medcurate_filter::Config::default();
        Self {
            input_dir: defaults.input_dir,
            output_dir: defaults.output_dir,
            model: None,
            threshold: defaults.classify.threshold,
            max_accepted: 0,
            key_column: defaults.classify.key_column,
            text_column: defaults.classify.text_column,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub database: PathBuf,
    pub table: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        let defaults = medcurate_load::LoadConfig::default();
        Self {
            database: defaults
                .database
                .unwrap_or_else(|| PathBuf::from("medcurate.duckdb")),
            table: defaults.table,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./medcurate.toml (current directory)
    /// 2. ~/.config/medcurate/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("medcurate.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "medcurate") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
