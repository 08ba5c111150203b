use std::path::PathBuf;

use anyhow::{Result, bail};

/// Configuration for loading filtered artifacts into DuckDB.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Parsed shards; the first one defines the table columns
    pub parquet_dir: PathBuf,
    /// Filter artifacts (`<shard_id>.json`) to insert
    pub json_dir: PathBuf,
    /// DuckDB database file; `None` keeps everything in memory
    pub database: Option<PathBuf>,
    /// Target table
    pub table: String,
    /// Create the table when it does not exist yet
    pub create_table: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            parquet_dir: PathBuf::from("parquet"),
            json_dir: PathBuf::from("filtered"),
            database: Some(PathBuf::from("medcurate.duckdb")),
            table: "imagenome".to_string(),
            create_table: true,
        }
    }
}

impl LoadConfig {
    /// Table names are spliced into DDL, so only plain identifiers pass
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.table) {
            bail!(
                "table name `{}` must match [A-Za-z_][A-Za-z0-9_]*",
                self.table
            );
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
