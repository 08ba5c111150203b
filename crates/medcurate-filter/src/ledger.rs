//! Completion ledger: which shards already have an artifact
//!
//! Derived from the output directory on every run, never stored. An artifact
//! only appears under its final name once fully written, so presence of
//! `<id>.json` is the whole "done" signal.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::error::FilterError;
use crate::shard::Shard;

/// Artifact file extension
pub const ARTIFACT_EXT: &str = "json";

/// `<output_dir>/<id>.json`
pub fn artifact_path(output_dir: &Path, shard_id: &str) -> PathBuf {
    output_dir.join(format!("{shard_id}.{ARTIFACT_EXT}"))
}

/// Shard ids with a finished artifact under `output_dir`.
///
/// Empty or missing directory → empty set. `.tmp` leftovers are not counted.
pub fn completed(output_dir: &Path) -> Result<FxHashSet<String>, FilterError> {
    let mut done = FxHashSet::default();
    let entries = match fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(done),
        Err(e) => return Err(FilterError::io(output_dir, e)),
    };

    for entry in entries {
        let path = entry.map_err(|e| FilterError::io(output_dir, e))?.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != ARTIFACT_EXT) {
            continue;
        }
        if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
            done.insert(id.to_string());
        }
    }
    Ok(done)
}

/// Split `all` into (remaining, done_count) against the ledger
pub fn remaining(all: Vec<Shard>, done: &FxHashSet<String>) -> (Vec<Shard>, usize) {
    let total = all.len();
    let remaining: Vec<Shard> = all.into_iter().filter(|s| !done.contains(&s.id)).collect();
    let skipped = total - remaining.len();
    (remaining, skipped)
}
