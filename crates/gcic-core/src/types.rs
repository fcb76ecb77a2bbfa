//! Shared record types for collectors, store, and dashboard

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// One agent's snapshot from the platform CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub sessions: u32,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub storage_bytes: u64,
    #[serde(default)]
    pub is_default: bool,
}

/// Server health snapshot assembled from free/df/uptime/proc-stat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerHealth {
    pub cpu_percent: f64,
    pub mem_used_mb: f64,
    pub mem_total_mb: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub load: [f64; 3],
    pub uptime: String,
}

impl ServerHealth {
    pub fn mem_percent(&self) -> f64 {
        if self.mem_total_mb > 0.0 {
            self.mem_used_mb / self.mem_total_mb * 100.0
        } else {
            0.0
        }
    }

    pub fn disk_percent(&self) -> f64 {
        if self.disk_total_gb > 0.0 {
            self.disk_used_gb / self.disk_total_gb * 100.0
        } else {
            0.0
        }
    }
}

/// Cron job status, normalized to a four-value enum.
/// Unknown statuses collapse to `Idle`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CronStatus {
    Ok,
    Error,
    Running,
    Idle,
}

impl CronStatus {
    /// Normalize a raw status field. Total: any input maps to a variant.
    pub fn normalize(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("error") {
            CronStatus::Error
        } else if lower.contains("running") {
            CronStatus::Running
        } else if lower == "ok" {
            CronStatus::Ok
        } else {
            CronStatus::Idle
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CronStatus::Ok => "ok",
            CronStatus::Error => "error",
            CronStatus::Running => "running",
            CronStatus::Idle => "idle",
        }
    }
}

impl FromStr for CronStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(CronStatus::normalize(s))
    }
}

impl std::fmt::Display for CronStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One scheduled job from the platform cron list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub name: String,
    pub status: CronStatus,
    #[serde(default)]
    pub last_run: String,
    #[serde(default)]
    pub next_run: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub consecutive_errors: u32,
}

/// One open port observed on the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortInfo {
    pub port: u16,
    pub service: String,
    pub state: String,
}

/// Security posture snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityStatus {
    pub ssh_intrusions_24h: u64,
    pub ports: Vec<PortInfo>,
    pub ufw_active: bool,
    pub fail2ban_active: bool,
    pub root_login_enabled: bool,
}

/// Network activity: connection counts plus peer IPs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkActivity {
    pub active_connections: u64,
    pub unique_ips: u64,
    pub peers: HashMap<String, u64>,
}

/// One source IP's login tally from the auth log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginEntry {
    pub ip: String,
    pub count: u64,
    pub last_seen: String,
}

/// Accepted/failed SSH login streams for the trailing 24h
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SshLoginSummary {
    pub accepted: Vec<LoginEntry>,
    pub failed: Vec<LoginEntry>,
}

impl SshLoginSummary {
    /// Total failed attempts across all source IPs
    pub fn total_failed(&self) -> u64 {
        self.failed.iter().map(|e| e.count).sum()
    }
}

/// One of the most-connected peer IPs, with resolved hostname
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopIp {
    pub ip: String,
    pub count: u64,
    pub hostname: String,
}

/// Severity of an activity-log event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl EventLevel {
    /// Classify a raw log line by its contents
    pub fn classify(line: &str) -> Self {
        let lower = line.to_lowercase();
        if lower.contains("error") || lower.contains("fail") {
            EventLevel::Error
        } else if lower.contains("warn") {
            EventLevel::Warning
        } else {
            EventLevel::Info
        }
    }
}

/// One activity-log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub time: String,
    pub message: String,
    pub source: String,
    pub level: EventLevel,
}

/// One row from the process list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessInfo {
    pub pid: String,
    pub user: String,
    pub cpu: String,
    pub mem: String,
    pub command: String,
}

/// One communications channel's health
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelStatus {
    pub name: String,
    pub enabled: String,
    pub state: String,
    pub detail: String,
}

/// Platform update availability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub available: bool,
    pub current: String,
    pub latest: String,
}

/// Gateway/session overview from the platform CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStatus {
    pub sessions: u32,
    pub model: String,
    pub gateway: String,
    pub version: String,
}

impl Default for PlatformStatus {
    fn default() -> Self {
        Self {
            sessions: 0,
            model: "unknown".to_string(),
            gateway: "unknown".to_string(),
            version: "unknown".to_string(),
        }
    }
}

/// Action-item severity for the SITREP panel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// One aggregated action item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub severity: Severity,
    pub text: String,
}

/// Geolocation of an IP address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoInfo {
    pub country_code: String,
    pub city: String,
    pub isp: String,
}

impl Default for GeoInfo {
    fn default() -> Self {
        Self {
            country_code: "?".to_string(),
            city: String::new(),
            isp: String::new(),
        }
    }
}

/// Result of an attacker port scan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanResult {
    pub open_ports: Vec<u16>,
    pub os_guess: String,
}

impl ScanResult {
    /// Serialize the port list as CSV for the cache table
    pub fn ports_csv(&self) -> String {
        self.open_ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the CSV port list back from the cache table
    pub fn from_cached(ports_csv: &str, os_guess: &str) -> Self {
        let open_ports = ports_csv
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        Self {
            open_ports,
            os_guess: os_guess.to_string(),
        }
    }
}

/// Three-valued trend summary plus "unknown"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
    Unknown,
}

impl Trend {
    pub fn as_arrow(&self) -> &'static str {
        match self {
            Trend::Up => "\u{2191}",
            Trend::Down => "\u{2193}",
            Trend::Flat => "\u{2192}",
            Trend::Unknown => "--",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_arrow())
    }
}

/// Tokens-per-hour rate; `Unknown` covers missing samples and counter resets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    PerHour(i64),
    Unknown,
}

impl Rate {
    pub fn numeric(&self) -> Option<i64> {
        match self {
            Rate::PerHour(n) => Some(*n),
            Rate::Unknown => None,
        }
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rate::PerHour(n) => write!(f, "{}", n),
            Rate::Unknown => write!(f, "--"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cron_status_normalize() {
        assert_eq!(CronStatus::normalize("ok"), CronStatus::Ok);
        assert_eq!(CronStatus::normalize("OK"), CronStatus::Ok);
        assert_eq!(CronStatus::normalize("Error (2)"), CronStatus::Error);
        assert_eq!(CronStatus::normalize("running"), CronStatus::Running);
        assert_eq!(CronStatus::normalize("queued"), CronStatus::Idle);
        assert_eq!(CronStatus::normalize(""), CronStatus::Idle);
    }

    #[test]
    fn test_cron_status_roundtrip() {
        for status in [
            CronStatus::Ok,
            CronStatus::Error,
            CronStatus::Running,
            CronStatus::Idle,
        ] {
            assert_eq!(status.as_str().parse::<CronStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_server_health_percentages() {
        let health = ServerHealth {
            mem_used_mb: 4096.0,
            mem_total_mb: 8192.0,
            disk_used_gb: 30.0,
            disk_total_gb: 100.0,
            ..Default::default()
        };
        assert!((health.mem_percent() - 50.0).abs() < f64::EPSILON);
        assert!((health.disk_percent() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_server_health_zero_totals() {
        let health = ServerHealth::default();
        assert_eq!(health.mem_percent(), 0.0);
        assert_eq!(health.disk_percent(), 0.0);
    }

    #[test]
    fn test_event_level_classify() {
        assert_eq!(EventLevel::classify("connection failed"), EventLevel::Error);
        assert_eq!(EventLevel::classify("ERROR: boom"), EventLevel::Error);
        assert_eq!(EventLevel::classify("warning: slow"), EventLevel::Warning);
        assert_eq!(EventLevel::classify("session opened"), EventLevel::Info);
    }

    #[test]
    fn test_scan_result_csv_roundtrip() {
        let scan = ScanResult {
            open_ports: vec![22, 80, 443],
            os_guess: "Linux".to_string(),
        };
        let restored = ScanResult::from_cached(&scan.ports_csv(), &scan.os_guess);
        assert_eq!(restored, scan);
    }

    #[test]
    fn test_scan_result_empty_csv() {
        let scan = ScanResult::from_cached("", "");
        assert!(scan.open_ports.is_empty());
    }

    #[test]
    fn test_trend_arrows() {
        assert_eq!(Trend::Up.as_arrow(), "↑");
        assert_eq!(Trend::Down.as_arrow(), "↓");
        assert_eq!(Trend::Flat.as_arrow(), "→");
        assert_eq!(Trend::Unknown.as_arrow(), "--");
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(Rate::PerHour(12000).to_string(), "12000");
        assert_eq!(Rate::Unknown.to_string(), "--");
        assert_eq!(Rate::Unknown.numeric(), None);
    }

    #[test]
    fn test_ssh_summary_total_failed() {
        let summary = SshLoginSummary {
            accepted: vec![],
            failed: vec![
                LoginEntry {
                    ip: "45.33.32.156".to_string(),
                    count: 47,
                    last_seen: String::new(),
                },
                LoginEntry {
                    ip: "104.248.168.210".to_string(),
                    count: 12,
                    last_seen: String::new(),
                },
                LoginEntry {
                    ip: "91.189.42.11".to_string(),
                    count: 8,
                    last_seen: String::new(),
                },
            ],
        };
        assert_eq!(summary.total_failed(), 67);
    }
}
