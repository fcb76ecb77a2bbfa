//! Emit and enable the systemd user service for the collector

use gcic_core::constants::SERVICE_NAME;
use gcic_core::{Error, Result};
use std::path::PathBuf;

use super::service;
use crate::output::{print_info, print_success};

pub async fn execute() -> Result<()> {
    let unit_dir = dirs::home_dir()
        .map(|h| h.join(".config/systemd/user"))
        .ok_or_else(|| Error::Service("cannot resolve home directory".to_string()))?;
    std::fs::create_dir_all(&unit_dir)?;

    let daemon_bin = find_daemon_binary()
        .ok_or_else(|| Error::Service("gcicd binary not found next to gcic or on PATH".to_string()))?;

    let unit = format!(
        r#"[Unit]
Description=GalacticCIC Data Collector
After=default.target

[Service]
Type=simple
ExecStart={daemon}
Restart=on-failure
RestartSec=30
StandardOutput=journal
StandardError=journal

[Install]
WantedBy=default.target
"#,
        daemon = daemon_bin.display(),
    );

    let unit_path = unit_dir.join(SERVICE_NAME);
    std::fs::write(&unit_path, unit)?;

    service::systemctl(&["daemon-reload"]).await?;
    service::systemctl(&["enable", SERVICE_NAME]).await?;

    print_success(&format!("Service installed at {}", unit_path.display()));
    print_info(&format!("Collector: {}", daemon_bin.display()));
    print_info("Run: gcic start");
    Ok(())
}

/// Prefer the gcicd that shipped beside this binary, then PATH
fn find_daemon_binary() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("gcicd");
            if sibling.exists() {
                return Some(sibling);
            }
        }
    }
    which::which("gcicd").ok()
}
