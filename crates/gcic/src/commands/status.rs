//! Collector daemon status plus database statistics

use colored::Colorize;
use gcic_core::constants::{self, control_keys};
use gcic_core::Result;
use gcic_db::Database;

use super::service;
use crate::output::print_db_stats;

pub async fn execute() -> Result<()> {
    if service::is_running().await? {
        let props = service::show_properties("MainPID,ActiveEnterTimestamp").await?;
        let get = |key: &str| {
            props
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap_or("?")
        };
        println!(
            "  Collector:  {} (PID {})",
            "● RUNNING".green(),
            get("MainPID")
        );
        println!("  Since:      {}", get("ActiveEnterTimestamp"));
    } else if service::is_installed().await? {
        println!("  Collector:  {} (service installed)", "✗ STOPPED".red());
    } else {
        println!("  Collector:  {}", "✗ NOT INSTALLED".red());
        println!("  Install:    gcic install");
        return Ok(());
    }

    let db_path = constants::db_path();
    if !db_path.exists() {
        println!("  Database:   not found");
        return Ok(());
    }

    let db = Database::open_existing(&db_path).await?;
    if let Some(state) = db.get_control(control_keys::DAEMON_STATE).await? {
        if state == "degraded" {
            println!(
                "  State:      {} (store writes failing)",
                "DEGRADED".yellow().bold()
            );
        } else {
            println!("  State:      {}", state);
        }
    }

    println!();
    print_db_stats(&db).await?;
    db.close().await;
    Ok(())
}
