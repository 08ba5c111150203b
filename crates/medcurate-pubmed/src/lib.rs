//! Medcurate PubMed - Medline XML to Parquet shards
//!
//! Converts local Medline/PubMed baseline files (`*.xml.gz` or `*.xml`) into
//! one Parquet shard per input, the layout the filter stage consumes.
//!
//! # Features
//!
//! - Streaming XML parsing with quick-xml
//! - Bounded parallelism on the shared worker pool
//! - Resumable: inputs with a valid shard are skipped
//!
//! # Example
//!
//! ```ignore
//! use medcurate_pubmed::{Config, run};
//!
//! let config = Config {
//!     input_dir: "baseline".into(),
//!     output_dir: "parquet".into(),
//!     workers: 4,
//!     ..Default::default()
//! };
//!
//! let summary = run(&config, &ProgressContext::new())?;
//! println!("Parsed {} articles", summary.total_articles);
//! ```

pub mod config;
pub mod parser;
pub mod runner;
pub mod schema;
pub mod transform;
pub mod worker;

// Re-exports
pub use config::Config;
pub use runner::{Summary, run};
