//! Shard enumeration: one shard per file directly under the input directory

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::FilterError;

/// One unit of work: a single columnar source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    /// File stem of the source file, also the artifact name
    pub id: String,
    pub source_path: PathBuf,
}

impl Shard {
    /// Artifact path for this shard under `output_dir`
    pub fn artifact_path(&self, output_dir: &Path) -> PathBuf {
        crate::ledger::artifact_path(output_dir, &self.id)
    }
}

/// Derive the shard id from a source file name.
///
/// `pubmed23n0001.parquet` → `pubmed23n0001`. `None` for hidden files,
/// in-progress `.tmp` files and non-UTF-8 names.
pub fn shard_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') || name.ends_with(".tmp") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    Some(stem.to_string())
}

/// List the shards under `dir`, sorted by id.
///
/// Non-recursive. A missing directory is an IO error; two files deriving the
/// same id are a configuration error.
pub fn enumerate(dir: &Path) -> Result<Vec<Shard>, FilterError> {
    let entries = fs::read_dir(dir).map_err(|e| FilterError::io(dir, e))?;

    let mut shards = Vec::new();
    let mut seen: FxHashMap<String, PathBuf> = FxHashMap::default();
    for entry in entries {
        let entry = entry.map_err(|e| FilterError::io(dir, e))?;
        let path = entry.path();
        let is_file = entry
            .file_type()
            .map_err(|e| FilterError::io(&path, e))?
            .is_file();
        if !is_file {
            continue;
        }
        let Some(id) = shard_id(&path) else {
            log::debug!("Ignoring {}", path.display());
            continue;
        };
        if let Some(other) = seen.insert(id.clone(), path.clone()) {
            return Err(FilterError::Configuration(format!(
                "{} and {} both map to shard id `{id}`",
                other.display(),
                path.display()
            )));
        }
        shards.push(Shard {
            id,
            source_path: path,
        });
    }

    shards.sort_by(|a, b| a.id.cmp(&b.id));
    log::debug!("{} shards under {}", shards.len(), dir.display());
    Ok(shards)
}
