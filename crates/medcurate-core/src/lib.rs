//! Medcurate Core - shared infrastructure for the curation pipeline stages
//!
//! Bounded worker pool, atomic output sinks, logging/progress plumbing and
//! cooperative shutdown used by the parse, filter and load stages.

pub mod logging;
pub mod pool;
pub mod progress;
pub mod semaphore;
pub mod shutdown;
pub mod sink;

// Re-exports for convenience
pub use logging::{IndicatifLogger, init_logging};
pub use pool::{JobError, PoolReport};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use semaphore::Semaphore;
pub use shutdown::{install_signal_handlers, is_shutdown_requested};
pub use sink::{ParquetSink, cleanup_tmp_files, is_valid_parquet, write_json_atomic};
