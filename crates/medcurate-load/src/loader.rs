//! DuckDB table creation and per-record artifact insertion

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use duckdb::types::Value as DbValue;
use duckdb::{Connection, params_from_iter};
use medcurate_filter::normalize;
use serde_json::{Map, Value};

use crate::sql;

/// Result of inserting one record
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    Failed { key: String, reason: String },
}

/// Per-artifact insert tally
#[derive(Debug, Default)]
pub struct ArtifactLoad {
    pub path: PathBuf,
    pub inserted: usize,
    /// `(record key, reason)` for every rejected record
    pub failed: Vec<(String, String)>,
}

impl ArtifactLoad {
    fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Failed { key, reason } => self.failed.push((key, reason)),
        }
    }
}

/// Connection to the curation database
pub struct Loader {
    conn: Connection,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader").finish_non_exhaustive()
    }
}

impl Loader {
    /// Open a database file, or an in-memory database for `None`
    pub fn open(database: Option<&Path>) -> Result<Self> {
        let conn = match database {
            Some(path) => Connection::open(path)
                .with_context(|| format!("Failed to open DuckDB at {}", path.display()))?,
            None => Connection::open_in_memory()
                .context("Failed to open DuckDB in-memory connection")?,
        };
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(sql::table_exists(), [table], |row| row.get(0))
            .with_context(|| format!("Failed to look up table {table}"))?;
        Ok(count > 0)
    }

    /// Column names of `table` in declaration order
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql::table_columns())?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list columns of {table}"))?;
        Ok(columns)
    }

    /// Column names of a parsed parquet shard
    pub fn parquet_columns(&self, path: &Path) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&sql::describe_parquet(path))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to describe {}", path.display()))?;
        Ok(columns)
    }

    /// Create `table` with `tab_id`, the given source columns and the derived
    /// columns. Returns `false` without touching anything if it already exists.
    pub fn create_table(&self, table: &str, columns: &[String]) -> Result<bool> {
        if self.table_exists(table)? {
            log::warn!("Table {table} already exists and will not be created");
            return Ok(false);
        }
        if sql::source_columns(columns).is_empty() {
            bail!("no source columns to create table {table} from");
        }
        self.conn
            .execute_batch(&sql::create_table(table, columns))
            .with_context(|| format!("Failed to create table {table}"))?;
        log::info!("Created table {table}");
        Ok(true)
    }

    /// Insert every record of one artifact into `table`.
    ///
    /// Errors only when the artifact itself cannot be read or the table is
    /// missing; a record the database rejects is reported in the returned
    /// tally and the remaining records are still inserted.
    pub fn fill_artifact(&self, table: &str, path: &Path) -> Result<ArtifactLoad> {
        let columns: Vec<String> = self
            .table_columns(table)?
            .into_iter()
            .filter(|c| c != sql::TAB_ID)
            .collect();
        if columns.is_empty() {
            bail!("table {table} does not exist");
        }

        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let records: Map<String, Value> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let mut stmt = self
            .conn
            .prepare(&sql::insert(table, &columns))
            .with_context(|| format!("Failed to prepare insert into {table}"))?;

        let mut load = ArtifactLoad {
            path: path.to_path_buf(),
            ..Default::default()
        };
        for (key, record) in &records {
            let outcome = match record.as_object() {
                Some(fields) => {
                    let row = row_values(&columns, fields);
                    match stmt.execute(params_from_iter(row.iter())) {
                        Ok(_) => InsertOutcome::Inserted,
                        Err(e) => InsertOutcome::Failed {
                            key: key.clone(),
                            reason: e.to_string(),
                        },
                    }
                }
                None => InsertOutcome::Failed {
                    key: key.clone(),
                    reason: "record is not a JSON object".to_string(),
                },
            };
            if let InsertOutcome::Failed { key, reason } = &outcome {
                log::warn!("{}: record {key} rejected: {reason}", path.display());
            }
            load.record(outcome);
        }
        Ok(load)
    }
}

/// Values for `columns` from one artifact record
fn row_values(columns: &[String], fields: &Map<String, Value>) -> Vec<DbValue> {
    columns
        .iter()
        .map(|column| match column.as_str() {
            sql::CLASS_VALUE => fields
                .get(sql::CLASS_VALUE)
                .and_then(Value::as_f64)
                .map_or(DbValue::Null, DbValue::Double),
            sql::CLEAN_ABSTRACT => clean(fields.get("abstract")),
            sql::CLEAN_TITLE => clean(fields.get("title")),
            other => text(fields.get(other)),
        })
        .collect()
}

fn clean(value: Option<&Value>) -> DbValue {
    match value.and_then(Value::as_str) {
        Some(s) => DbValue::Text(normalize(s)),
        None => DbValue::Null,
    }
}

/// Strings as-is, null/missing as NULL, anything else as JSON text
fn text(value: Option<&Value>) -> DbValue {
    match value {
        None | Some(Value::Null) => DbValue::Null,
        Some(Value::String(s)) => DbValue::Text(s.clone()),
        Some(other) => DbValue::Text(other.to_string()),
    }
}
