//! Restart the collector daemon

use gcic_core::constants::SERVICE_NAME;
use gcic_core::{Error, Result};
use std::time::Duration;

use super::service;
use crate::output::print_success;

pub async fn execute() -> Result<()> {
    service::systemctl(&["restart", SERVICE_NAME]).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    if service::is_running().await? {
        print_success("Collector restarted");
        Ok(())
    } else {
        let (status_out, _) = service::systemctl(&["status", SERVICE_NAME]).await?;
        eprintln!("{}", status_out);
        Err(Error::Service("collector failed to restart".to_string()))
    }
}
