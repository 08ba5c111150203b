pub mod config;
pub mod filter;
pub mod load;
pub mod parse;
pub mod status;

use std::process::ExitCode;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

/// Exit status after a stage: 130 on shutdown, 1 if anything failed
pub fn exit_code(failed: bool) -> ExitCode {
    if medcurate_core::is_shutdown_requested() {
        log::warn!("Stopped by signal; rerun to finish the remaining shards");
        ExitCode::from(130)
    } else if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}
