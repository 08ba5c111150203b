//! medcurate-load: curated records into a DuckDB table
//!
//! Creates the curated table from the columns of the parsed shards plus
//! `tab_id`, `class_value`, `clean_abstract` and `clean_title`, then inserts
//! every record of every filter artifact. Each insert yields an
//! [`InsertOutcome`]; rejected records are reported, never dropped silently.

mod config;
mod loader;
mod sql;

pub use config::LoadConfig;
pub use loader::{ArtifactLoad, InsertOutcome, Loader};

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

/// Summary statistics from the load operation.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub table: String,
    pub created: bool,
    pub artifacts: Vec<ArtifactLoad>,
    /// Artifacts that could not be read at all, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
    pub elapsed: Duration,
}

impl LoadSummary {
    pub fn inserted(&self) -> usize {
        self.artifacts.iter().map(|a| a.inserted).sum()
    }

    pub fn failed_records(&self) -> usize {
        self.artifacts.iter().map(|a| a.failed.len()).sum()
    }

    /// Nothing rejected and every artifact readable
    pub fn is_clean(&self) -> bool {
        self.unreadable.is_empty() && self.failed_records() == 0
    }

    /// Format per-artifact table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new(format!("Load → {}", self.table))
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Inserted").fg(Color::Cyan),
                Cell::new("Failed").fg(Color::Cyan),
            ]);

        for artifact in &self.artifacts {
            let name = artifact
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let failed = Cell::new(artifact.failed.len());
            table.add_row(vec![
                Cell::new(name),
                Cell::new(artifact.inserted),
                if artifact.failed.is_empty() {
                    failed
                } else {
                    failed.fg(Color::Red)
                },
            ]);
        }
        for (path, reason) in &self.unreadable {
            table.add_row(vec![
                Cell::new(path.display()).fg(Color::Red),
                Cell::new("-"),
                Cell::new(reason).fg(Color::Red),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total").fg(Color::Green),
            Cell::new(self.inserted()).fg(Color::Green),
            Cell::new(self.failed_records()),
        ]);

        format!("\n{table}")
    }

    pub fn log(&self) {
        log::info!(
            "Load complete: {} records into {} ({} failed, {} unreadable artifacts) [{:.1}s]",
            self.inserted(),
            self.table,
            self.failed_records(),
            self.unreadable.len(),
            self.elapsed.as_secs_f64()
        );
    }
}

/// Sorted paths matching `pattern` directly under `dir`
fn list_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = format!("{escaped}/{pattern}");
    let mut paths: Vec<PathBuf> = glob::glob(&full)
        .with_context(|| format!("Invalid glob pattern: {full}"))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Columns for a new table: first parquet shard, else first artifact record
fn source_columns(
    loader: &Loader,
    config: &LoadConfig,
    artifacts: &[PathBuf],
) -> Result<Vec<String>> {
    if let Some(shard) = list_files(&config.parquet_dir, "*.parquet")?.first() {
        log::info!("Taking table columns from {}", shard.display());
        return loader.parquet_columns(shard);
    }
    for path in artifacts {
        let bytes = std::fs::read(path)?;
        let records: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
        if let Some(fields) = records.values().find_map(|r| r.as_object()) {
            log::info!("Taking table columns from {}", path.display());
            return Ok(fields.keys().cloned().collect());
        }
    }
    bail!(
        "no parquet shard in {} and no non-empty artifact in {} to derive columns from",
        config.parquet_dir.display(),
        config.json_dir.display()
    )
}

/// Run the load stage.
pub fn run(config: &LoadConfig) -> Result<LoadSummary> {
    let start = Instant::now();
    config.validate()?;

    let loader = Loader::open(config.database.as_deref())?;
    let artifacts = list_files(&config.json_dir, "*.json")?;
    log::info!(
        "Loading {} artifacts from {}",
        artifacts.len(),
        config.json_dir.display()
    );

    let mut summary = LoadSummary {
        table: config.table.clone(),
        ..Default::default()
    };

    if !loader.table_exists(&config.table)? {
        if !config.create_table {
            bail!(
                "table {} does not exist (run without --no-create to create it)",
                config.table
            );
        }
        let columns = source_columns(&loader, config, &artifacts)?;
        summary.created = loader.create_table(&config.table, &columns)?;
    }

    for path in &artifacts {
        match loader.fill_artifact(&config.table, path) {
            Ok(load) => {
                log::debug!(
                    "{}: {} inserted, {} failed",
                    path.display(),
                    load.inserted,
                    load.failed.len()
                );
                summary.artifacts.push(load);
            }
            Err(e) => {
                log::warn!("Skipping {}: {e:#}", path.display());
                summary.unreadable.push((path.clone(), format!("{e:#}")));
            }
        }
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}
