//! CLI output formatting

use chrono::{Local, TimeZone};
use colored::Colorize;
use gcic_core::Result;
use gcic_db::Database;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "table")]
    label: &'static str,
    #[tabled(rename = "rows")]
    rows: i64,
    #[tabled(rename = "latest")]
    latest: String,
}

/// Print database size and per-table statistics
pub async fn print_db_stats(db: &Database) -> Result<()> {
    let db_path = gcic_core::constants::db_path();
    if let Ok(meta) = std::fs::metadata(&db_path) {
        println!(
            "  Database: {} ({:.1}MB)",
            db_path.display(),
            meta.len() as f64 / 1024.0 / 1024.0
        );
    }

    let rows: Vec<StatsRow> = db
        .stats()
        .await?
        .into_iter()
        .map(|s| StatsRow {
            label: s.label,
            rows: s.rows,
            latest: s
                .newest
                .and_then(|ts| Local.timestamp_opt(ts as i64, 0).single())
                .map(|dt| dt.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    Ok(())
}
