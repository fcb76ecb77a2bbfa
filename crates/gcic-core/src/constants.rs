//! Constants and default values for GalacticCIC

use std::path::PathBuf;
use std::time::Duration;

/// GalacticCIC home directory name
pub const GCIC_DIR: &str = ".galactic_cic";

/// Metrics database file name
pub const DB_FILE: &str = "metrics.db";

/// Dashboard config file name
pub const CONFIG_FILE: &str = "config.json";

/// Collector daemon log file name
pub const LOG_FILE: &str = "collector.log";

/// Systemd user service unit name
pub const SERVICE_NAME: &str = "galactic-cic-collector.service";

/// Fast tier interval: server health, top processes
pub const TIER_FAST: Duration = Duration::from_secs(30);

/// Medium tier interval: cron, activity log, network
pub const TIER_MEDIUM: Duration = Duration::from_secs(120);

/// Slow tier interval: agents, platform status, security, SITREP
pub const TIER_SLOW: Duration = Duration::from_secs(300);

/// Glacial tier interval: DNS, geolocation, attacker scans
pub const TIER_GLACIAL: Duration = Duration::from_secs(900);

/// Time-series retention: 30 days
pub const RETENTION_SECS: f64 = 30.0 * 24.0 * 3600.0;

/// DNS cache TTL: 24 hours
pub const DNS_TTL_SECS: f64 = 86_400.0;

/// Geolocation cache TTL: 7 days
pub const GEO_TTL_SECS: f64 = 7.0 * 86_400.0;

/// Attacker scan cache TTL: 6 hours
pub const SCAN_TTL_SECS: f64 = 6.0 * 3600.0;

/// Default command timeout
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP request timeout (geo lookups)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Attacker nmap timeout
pub const NMAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period for in-flight collectors on shutdown
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Consecutive store-write failures before the daemon reports degraded
pub const WRITE_FAILURE_DEGRADE_THRESHOLD: u32 = 10;

/// Minimum dashboard refresh interval in seconds
pub const MIN_REFRESH_SECS: u64 = 1;

/// Number of failed-SSH source IPs enriched by the glacial tier
pub const ATTACKER_SCAN_LIMIT: usize = 3;

/// Snapshot keys stored in sitrep_cache, with per-key TTLs
pub mod sitrep_keys {
    pub const CHANNELS: &str = "channels";
    pub const UPDATE_CHECK: &str = "update_check";
    pub const ACTION_ITEMS: &str = "action_items";
    pub const PLATFORM_STATUS: &str = "platform_status";
    pub const TOP_PROCESSES: &str = "top_processes";
    pub const ACTIVITY_RECENT: &str = "activity_recent";
    pub const ACTIVITY_ERRORS: &str = "activity_errors";
    pub const SSH_SUMMARY: &str = "ssh_summary";
    pub const TOP_IPS: &str = "top_ips";

    /// TTL in seconds for a snapshot key
    pub fn ttl(key: &str) -> f64 {
        match key {
            UPDATE_CHECK => 3600.0,
            TOP_PROCESSES => 120.0,
            SSH_SUMMARY | TOP_IPS => 600.0,
            _ => 300.0,
        }
    }
}

/// Control-plane keys in the config table
pub mod control_keys {
    pub const NMAP_ACTIVE: &str = "nmap_active";
    pub const DAEMON_STATE: &str = "daemon_state";
}

/// Get the GalacticCIC home directory
pub fn gcic_home() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(GCIC_DIR))
        .unwrap_or_else(|| PathBuf::from(GCIC_DIR))
}

/// Get the metrics database path
pub fn db_path() -> PathBuf {
    gcic_home().join(DB_FILE)
}

/// Get the dashboard config path
pub fn config_path() -> PathBuf {
    gcic_home().join(CONFIG_FILE)
}

/// Get the collector log path
pub fn log_path() -> PathBuf {
    gcic_home().join(LOG_FILE)
}

/// Current wall-clock time as seconds since epoch
pub fn now_epoch() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
