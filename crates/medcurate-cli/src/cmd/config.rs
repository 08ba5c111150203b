//! Config subcommand - print the effective configuration

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

pub fn run(config: &Config) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Workers",
        &format!("{} (max: {})", config.workers.default, config.workers.max),
    ]);
    table.add_row(vec![
        "Parse input",
        &config.parse.input_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Parse output",
        &config.parse.output_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Compression level",
        &config.parse.zstd_level.to_string(),
    ]);
    table.add_row(vec![
        "Filter input",
        &config.filter.input_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Filter output",
        &config.filter.output_dir.display().to_string(),
    ]);
    table.add_row(vec![
        "Model",
        &config
            .filter
            .model
            .as_ref()
            .map_or_else(|| "not set".to_string(), |p| p.display().to_string()),
    ]);
    table.add_row(vec!["Threshold", &config.filter.threshold.to_string()]);
    table.add_row(vec![
        "Max accepted",
        &match config.filter.max_accepted {
            0 => "unbounded".to_string(),
            n => n.to_string(),
        },
    ]);
    table.add_row(vec![
        "Columns",
        &format!(
            "key={} text={}",
            config.filter.key_column, config.filter.text_column
        ),
    ]);
    table.add_row(vec![
        "Database",
        &config.load.database.display().to_string(),
    ]);
    table.add_row(vec!["Table", &config.load.table]);

    eprintln!("\n{table}");
}
