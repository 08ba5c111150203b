//! Medcurate Filter - resumable, parallel classification of Parquet shards
//!
//! Each shard under the input directory is read, its abstracts normalized and
//! scored by a [`Classifier`], and the records scoring above the threshold are
//! written to `<shard_id>.json` in the output directory. Shards that already
//! have an artifact are skipped, so an interrupted run picks up where it
//! stopped.
//!
//! ```text
//! shard::enumerate ─► ledger::remaining ─► pool ─► classify_shard ─► <id>.json
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod record;
pub mod runner;
pub mod shard;
pub mod stats;
pub mod text;

pub use classify::{ClassifyOptions, ShardStats, classify_shard};
pub use config::Config;
pub use error::FilterError;
pub use model::{Classifier, LexiconModel, ModelError};
pub use runner::{Plan, plan, run};
pub use shard::Shard;
pub use stats::{ShardFailure, Summary};
pub use text::normalize;
