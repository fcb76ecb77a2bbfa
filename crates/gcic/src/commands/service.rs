//! systemctl --user wrapper for the collector service

use gcic_core::constants::SERVICE_NAME;
use gcic_core::{Error, Result};
use tokio::process::Command;

/// Run a `systemctl --user` verb; returns (stdout, success)
pub async fn systemctl(args: &[&str]) -> Result<(String, bool)> {
    let output = Command::new("systemctl")
        .arg("--user")
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Service(format!("systemctl: {}", e)))?;

    Ok((
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
        output.status.success(),
    ))
}

/// Whether the collector service is currently active
pub async fn is_running() -> Result<bool> {
    let (out, _) = systemctl(&["is-active", SERVICE_NAME]).await?;
    Ok(out == "active")
}

/// Whether the service unit is installed at all
pub async fn is_installed() -> Result<bool> {
    let (out, _) = systemctl(&["list-unit-files", SERVICE_NAME]).await?;
    Ok(out.contains(SERVICE_NAME))
}

/// Read selected unit properties as key/value pairs
pub async fn show_properties(properties: &str) -> Result<Vec<(String, String)>> {
    let prop_arg = format!("--property={}", properties);
    let (out, _) = systemctl(&["show", SERVICE_NAME, &prop_arg]).await?;
    Ok(out
        .lines()
        .filter_map(|line| {
            line.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect())
}
