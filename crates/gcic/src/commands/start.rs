//! Start the collector daemon via its user service

use gcic_core::constants::SERVICE_NAME;
use gcic_core::{Error, Result};
use std::time::Duration;

use super::service;
use crate::output::{print_info, print_success};

pub async fn execute() -> Result<()> {
    if service::is_running().await? {
        print_info("Collector is already running");
        return Ok(());
    }

    service::systemctl(&["start", SERVICE_NAME]).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    if service::is_running().await? {
        print_success("Collector started");
        Ok(())
    } else {
        let (status_out, _) = service::systemctl(&["status", SERVICE_NAME]).await?;
        eprintln!("{}", status_out);
        Err(Error::Service("collector failed to start".to_string()))
    }
}
