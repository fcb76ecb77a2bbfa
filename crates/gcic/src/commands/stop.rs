//! Stop the collector daemon

use gcic_core::constants::SERVICE_NAME;
use gcic_core::{Error, Result};
use std::time::Duration;

use super::service;
use crate::output::{print_info, print_success};

pub async fn execute() -> Result<()> {
    if !service::is_running().await? {
        print_info("Collector is not running");
        return Ok(());
    }

    service::systemctl(&["stop", SERVICE_NAME]).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    if !service::is_running().await? {
        print_success("Collector stopped");
        Ok(())
    } else {
        Err(Error::Service("collector failed to stop".to_string()))
    }
}
