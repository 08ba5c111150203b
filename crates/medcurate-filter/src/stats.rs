//! Run summary for the filter stage
//!
//! - Shard-level: [`ShardStats`](crate::classify::ShardStats), one per
//!   completed shard
//! - Run-level: [`Summary`], aggregated by the driver after the pool drains

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use medcurate_core::fmt_num;

use crate::classify::ShardStats;
use crate::error::FilterError;

/// A shard that produced no artifact this run
#[derive(Debug)]
pub struct ShardFailure {
    pub id: String,
    pub error: FilterError,
}

/// Aggregated outcome of one filter run.
#[derive(Debug, Default)]
pub struct Summary {
    /// Shards found under the input directory
    pub total: usize,
    /// Already done before this run
    pub skipped: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failures: Vec<ShardFailure>,
    /// Left unsubmitted because of shutdown
    pub not_started: usize,
    pub records_read: usize,
    pub records_scored: usize,
    pub records_accepted: usize,
    pub capped_shards: usize,
    pub elapsed: Duration,
}

impl Summary {
    /// Fold in one completed shard.
    pub fn add_shard(&mut self, stats: &ShardStats) {
        self.completed += 1;
        self.records_read += stats.records_read;
        self.records_scored += stats.scored;
        self.records_accepted += stats.accepted;
        if stats.capped {
            self.capped_shards += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Every submitted shard finished and nothing was left behind
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.not_started == 0
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Filter")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
                Cell::new("%").fg(Color::Cyan),
            ]);

        table.add_row(vec![
            Cell::new("Shards"),
            Cell::new(format!(
                "{}/{} ({} skipped, {} failed)",
                self.completed,
                self.total,
                self.skipped,
                self.failed()
            )),
            Cell::new(""),
        ]);
        if self.not_started > 0 {
            table.add_row(vec![
                Cell::new("Not started").fg(Color::Yellow),
                Cell::new(fmt_num(self.not_started)).fg(Color::Yellow),
                Cell::new(""),
            ]);
        }
        table.add_row(vec![
            Cell::new("Records read"),
            Cell::new(fmt_num(self.records_read)),
            Cell::new(""),
        ]);
        table.add_row(vec![
            Cell::new("Scored"),
            Cell::new(fmt_num(self.records_scored)),
            Cell::new(format!("{:.1}", pct(self.records_scored, self.records_read))),
        ]);
        table.add_row(vec![
            Cell::new("Accepted").fg(Color::Green),
            Cell::new(fmt_num(self.records_accepted)).fg(Color::Green),
            Cell::new(format!(
                "{:.1}",
                pct(self.records_accepted, self.records_scored)
            ))
            .fg(Color::Green),
        ]);
        if self.capped_shards > 0 {
            table.add_row(vec![
                Cell::new("Capped shards"),
                Cell::new(fmt_num(self.capped_shards)),
                Cell::new(""),
            ]);
        }
        table.add_row(vec![
            Cell::new("Time"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
            Cell::new(""),
        ]);

        for failure in &self.failures {
            table.add_row(vec![
                Cell::new(format!("Failed: {}", failure.id)).fg(Color::Red),
                Cell::new(failure.error.to_string()).fg(Color::Red),
                Cell::new(""),
            ]);
        }

        format!("\n{table}")
    }

    /// Print summary table (TTY mode).
    pub fn print(&self) {
        println!("{}", self.format_table());
    }

    /// Log minimal summary (non-TTY mode).
    pub fn log(&self) {
        log::info!(
            "Filter complete: {} accepted of {} scored ({}/{} shards, {} skipped, {} failed) [{:.1}s]",
            fmt_num(self.records_accepted),
            fmt_num(self.records_scored),
            self.completed,
            self.total,
            self.skipped,
            self.failed(),
            self.elapsed.as_secs_f64()
        );
        for failure in &self.failures {
            log::warn!("  {}: {}", failure.id, failure.error);
        }
    }
}

/// Calculate percentage safely.
fn pct(part: usize, total: usize) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
