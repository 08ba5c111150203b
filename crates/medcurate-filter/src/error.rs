//! Error taxonomy for the filter stage
//!
//! Only [`FilterError::Configuration`] is fatal for a run. Every other
//! variant is raised per shard: the shard is reported as failed, keeps no
//! artifact, and is retried on the next run.

use std::path::PathBuf;

use crate::model::ModelError;

#[derive(Debug)]
pub enum FilterError {
    /// Bad input/output directory, duplicate shard ids, invalid settings
    Configuration(String),
    /// Shard file cannot be decoded or lacks a required column
    DataFormat { path: PathBuf, reason: String },
    /// The classifier failed on a record
    Model(ModelError),
    /// Worker terminated abnormally (panic)
    WorkerPool(String),
    /// Filesystem error while reading a shard or writing its artifact
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration: {msg}"),
            Self::DataFormat { path, reason } => {
                write!(f, "bad data in {}: {reason}", path.display())
            }
            Self::Model(e) => write!(f, "model: {e}"),
            Self::WorkerPool(msg) => write!(f, "worker: {msg}"),
            Self::Io { path, source } => write!(f, "IO on {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ModelError> for FilterError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl FilterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn data(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::DataFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error should stop the run before any shard is submitted
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
