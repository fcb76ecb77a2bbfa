//! Parsers for external command output
//!
//! Every parser is total: any byte string yields either typed records or
//! `None`/empty, never a panic. Collectors turn empty results into dashes.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use gcic_core::{
    AgentRecord, ChannelStatus, CronJob, CronStatus, LoginEntry, PortInfo, ProcessInfo,
    ScanResult, SshLoginSummary, UpdateStatus,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static LOAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"load average:\s*([\d.]+),?\s*([\d.]+),?\s*([\d.]+)").unwrap());
static UPTIME_USER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"up\s+(.+?),\s+\d+\s+user").unwrap());
static UPTIME_LOAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"up\s+(.+?),\s+load").unwrap());
static AUTH_IP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"from\s+(\d+\.\d+\.\d+\.\d+)").unwrap());
static SYSLOG_TS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)\s+(\d+)\s+(\d+:\d+:\d+)").unwrap());
static TOKEN_USAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)k/(\d+)k\s*\((\d+)%\)").unwrap());
static SS_PROCESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static HOST_POINTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"pointer\s+(.+)\.").unwrap());
static CHANNEL_ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"│\s*(\S+)\s*│\s*(\S+)\s*│\s*(\S+)\s*│\s*(.*?)\s*│").unwrap());
static UPDATE_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"update ([\d.]+(?:-\d+)?)").unwrap());
static APP_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"app ([\d.]+(?:-\d+)?)").unwrap());
static LOG_TS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})[T ](\d{2}:\d{2})").unwrap());

/// Parse a size string with `K|M|G|T` (SI, x1000) or `Ki|Mi|Gi|Ti`
/// (binary, x1024) suffixes into bytes. Bare numbers are bytes.
/// Unknown units yield `None`.
pub fn parse_size_bytes(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (digits, multiplier) = if let Some(prefix) = strip_binary_marker(s) {
        // Binary suffix: the char before the 'i' selects the power of 1024.
        let (digits, unit) = split_last_char(prefix)?;
        (digits, binary_multiplier(unit)?)
    } else if let Some((digits, unit)) = split_unit(s) {
        (digits, si_multiplier(unit)?)
    } else {
        (s, 1.0)
    };

    let value: f64 = digits.trim().parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier) as u64)
}

/// Strip a trailing `i`/`I` when it follows a unit letter ("1Ki" yes,
/// "1024i" no)
fn strip_binary_marker(s: &str) -> Option<&str> {
    let prefix = s.strip_suffix('i').or_else(|| s.strip_suffix('I'))?;
    if prefix.ends_with(|c: char| c.is_ascii_alphabetic()) {
        Some(prefix)
    } else {
        None
    }
}

fn split_last_char(s: &str) -> Option<(&str, char)> {
    let c = s.chars().last()?;
    Some((&s[..s.len() - c.len_utf8()], c))
}

fn split_unit(s: &str) -> Option<(&str, char)> {
    let c = s.chars().last()?;
    if c.is_ascii_alphabetic() {
        Some((&s[..s.len() - c.len_utf8()], c))
    } else {
        None
    }
}

fn binary_multiplier(unit: char) -> Option<f64> {
    match unit.to_ascii_uppercase() {
        'K' => Some(1024.0),
        'M' => Some(1024.0 * 1024.0),
        'G' => Some(1024.0 * 1024.0 * 1024.0),
        'T' => Some(1024.0_f64.powi(4)),
        _ => None,
    }
}

fn si_multiplier(unit: char) -> Option<f64> {
    match unit.to_ascii_uppercase() {
        'K' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        'T' => Some(1e12),
        _ => None,
    }
}

/// Size string to mebibytes (used for memory figures)
pub fn size_to_mb(s: &str) -> Option<f64> {
    parse_size_bytes(s).map(|b| b as f64 / (1024.0 * 1024.0))
}

/// Size string to gigabytes (used for disk figures)
pub fn size_to_gb(s: &str) -> Option<f64> {
    parse_size_bytes(s).map(|b| b as f64 / 1e9)
}

/// Parse `free -h` output: (used_mb, total_mb) from the `Mem:` row
pub fn parse_free(output: &str) -> Option<(f64, f64)> {
    let line = output.lines().find(|l| l.starts_with("Mem:"))?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }
    Some((size_to_mb(parts[2])?, size_to_mb(parts[1])?))
}

/// Parse `df -h /` output: (used_gb, total_gb, percent)
pub fn parse_df(output: &str) -> Option<(f64, f64, f64)> {
    let line = output.lines().nth(1)?;
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }
    let percent = parts[4].trim_end_matches('%').parse().unwrap_or(0.0);
    Some((size_to_gb(parts[2])?, size_to_gb(parts[1])?, percent))
}

/// Parse `uptime` output: load averages plus the human uptime string
pub fn parse_uptime(output: &str) -> ([f64; 3], String) {
    let mut load = [0.0; 3];
    if let Some(caps) = LOAD_RE.captures(output) {
        for i in 0..3 {
            load[i] = caps[i + 1].parse().unwrap_or(0.0);
        }
    }

    let uptime = UPTIME_USER_RE
        .captures(output)
        .or_else(|| UPTIME_LOAD_RE.captures(output))
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    (load, uptime)
}

/// Parse the aggregate `cpu` line of /proc/stat into its first 7 counters
pub fn parse_proc_stat(content: &str) -> Option<Vec<u64>> {
    let line = content.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(7)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() == 7 {
        Some(fields)
    } else {
        None
    }
}

/// CPU utilization between two /proc/stat readings
pub fn cpu_percent_between(prev: &[u64], current: &[u64]) -> Option<f64> {
    if prev.len() < 7 || current.len() < 7 {
        return None;
    }
    let idle_prev = prev[3] + prev[4];
    let idle_now = current[3] + current[4];
    let total_prev: u64 = prev.iter().sum();
    let total_now: u64 = current.iter().sum();
    let total_diff = total_now.checked_sub(total_prev)?;
    if total_diff == 0 {
        return None;
    }
    let idle_diff = idle_now.saturating_sub(idle_prev);
    Some((total_diff - idle_diff) as f64 / total_diff as f64 * 100.0)
}

/// Parse `openclaw agents list`: `- name (default)` headers with `Model:` /
/// `Workspace:` continuation lines. Sessions, tokens, and storage are filled
/// in by later passes.
pub fn parse_agents_list(output: &str) -> Vec<AgentRecord> {
    let mut agents: Vec<AgentRecord> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if let Some(raw) = line.strip_prefix("- ") {
            let name = raw.split('(').next().unwrap_or("").trim().to_string();
            if name.is_empty() {
                continue;
            }
            agents.push(AgentRecord {
                name,
                model: String::new(),
                workspace: String::new(),
                sessions: 0,
                tokens_used: 0,
                storage_bytes: 0,
                is_default: raw.contains("(default)"),
            });
        } else if let Some(agent) = agents.last_mut() {
            if let Some(model) = line.strip_prefix("Model:") {
                agent.model = model
                    .trim()
                    .replace("anthropic/", "")
                    .replace("claude-", "");
            } else if let Some(ws) = line.strip_prefix("Workspace:") {
                agent.workspace = ws.trim().to_string();
            }
        }
    }
    agents
}

/// Fill per-agent session counts and token totals from `openclaw status`
/// output. Session lines look like `agent:main: ... 126k/80k (158%)`.
pub fn apply_status_tokens(agents: &mut [AgentRecord], status_output: &str) {
    for agent in agents.iter_mut() {
        let marker = format!("agent:{}:", agent.name);
        let mut sessions = 0u32;
        let mut total_k = 0u64;
        for line in status_output.lines() {
            if line.contains(&marker) {
                sessions += 1;
                if let Some(caps) = TOKEN_USAGE_RE.captures(line) {
                    total_k += caps[1].parse::<u64>().unwrap_or(0);
                }
            }
        }
        agent.sessions = sessions;
        agent.tokens_used = total_k * 1000;
    }
}

/// Parse the `openclaw cron list` column table. The header row anchors
/// column positions; Doctor diagnostics above it are skipped. Unknown
/// statuses normalize to idle.
pub fn parse_cron_list(output: &str) -> Vec<CronJob> {
    let lines: Vec<&str> = output.lines().collect();

    let header_idx = match lines
        .iter()
        .position(|l| l.starts_with("ID") && l.contains("Name") && l.contains("Schedule"))
    {
        Some(i) => i,
        None => return Vec::new(),
    };
    let header = lines[header_idx];

    let col = |name: &str| header.find(name);
    let name_start = col("Name");
    let sched_start = col("Schedule");
    let next_start = col("Next");
    let last_start = col("Last");
    let status_start = col("Status");
    let errors_start = col("Errors");
    let agent_start = col("Agent");
    let name_end = sched_start.or(next_start);
    let status_end = col("Target").or(errors_start).or(agent_start);

    let slice = |line: &str, start: Option<usize>, end: Option<usize>| -> String {
        let start = match start {
            Some(s) if s < line.len() => s,
            _ => return String::new(),
        };
        let end = end.filter(|e| *e <= line.len()).unwrap_or(line.len());
        // get() keeps this total on lines with multi-byte characters.
        line.get(start..end)
            .map(str::trim)
            .unwrap_or("")
            .to_string()
    };

    let mut jobs = Vec::new();
    for line in &lines[header_idx + 1..] {
        if line.trim().is_empty() {
            continue;
        }
        let name = slice(line, name_start, name_end)
            .trim_end_matches('.')
            .chars()
            .take(22)
            .collect::<String>()
            .trim()
            .to_string();
        if name.is_empty() {
            continue;
        }

        let next_run = slice(line, next_start, last_start);
        let mut last_run = slice(line, last_start, status_start);
        if last_run == "-" {
            last_run.clear();
        }
        let status_field = slice(line, status_start, status_end);
        let consecutive_errors = slice(line, errors_start, agent_start)
            .parse()
            .unwrap_or(0);
        let agent = slice(line, agent_start, None)
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();

        jobs.push(CronJob {
            name,
            status: CronStatus::normalize(&status_field),
            last_run,
            next_run,
            agent,
            consecutive_errors,
        });
    }
    jobs
}

/// Parse `ps aux --sort=-%cpu`: first `count` rows after the header
pub fn parse_ps(output: &str, count: usize) -> Vec<ProcessInfo> {
    output
        .lines()
        .skip(1)
        .take(count)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 11 {
                return None;
            }
            let command = parts[10..].join(" ");
            Some(ProcessInfo {
                pid: parts[1].to_string(),
                user: parts[0].chars().take(8).collect(),
                cpu: parts[2].to_string(),
                mem: parts[3].to_string(),
                command: command
                    .rsplit('/')
                    .next()
                    .unwrap_or(&command)
                    .chars()
                    .take(20)
                    .collect(),
            })
        })
        .collect()
}

/// Parse `ss -tlnp`: listening ports with the owning process name
pub fn parse_ss_listening(output: &str) -> Vec<PortInfo> {
    let mut ports = Vec::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let local_addr = parts[3];
        let port: u16 = match local_addr.rsplit(':').next().and_then(|p| p.parse().ok()) {
            Some(p) => p,
            None => continue,
        };

        let process = parts
            .iter()
            .find(|p| p.contains("users:"))
            .and_then(|p| SS_PROCESS_RE.captures(p))
            .map(|c| c[1].to_string());

        ports.push(PortInfo {
            port,
            service: process.unwrap_or_else(|| format!("port-{}", port)),
            state: "open".to_string(),
        });
    }
    ports
}

/// Parse `ss -tnp`: peer-IP connection counts, excluding loopback and
/// link-local addresses
pub fn parse_ss_peers(output: &str) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            continue;
        }
        let peer_addr = parts[4];
        let ip = match peer_addr.rsplit_once(':') {
            Some((ip, _port)) => ip,
            None => peer_addr,
        };
        let ip = ip.trim_matches(|c| c == '[' || c == ']');
        if is_local_ip(ip) {
            continue;
        }
        *counts.entry(ip.to_string()).or_insert(0) += 1;
    }
    counts
}

fn is_local_ip(ip: &str) -> bool {
    ip.is_empty()
        || ip == "*"
        || ip == "127.0.0.1"
        || ip == "0.0.0.0"
        || ip == "::1"
        || ip == "::"
        || ip.starts_with("127.")
        || ip.starts_with("169.254.")
        || ip.starts_with("fe80")
}

/// Parse auth-log content into accepted/failed login streams, restricted to
/// the trailing 24 hours of `now`. Entries are sorted by count, descending.
pub fn parse_auth_log(content: &str, now: DateTime<Utc>) -> SshLoginSummary {
    let mut accepted: HashMap<String, (u64, String)> = HashMap::new();
    let mut failed: HashMap<String, (u64, String)> = HashMap::new();

    for line in content.lines() {
        let is_accepted = line.contains("Accepted");
        let is_failed = line.contains("Failed password") || line.contains("Invalid user");
        if !is_accepted && !is_failed {
            continue;
        }

        let ts = match parse_syslog_timestamp(line, now) {
            Some(ts) => ts,
            None => continue,
        };
        if (now - ts).num_seconds() > 86_400 || ts > now {
            continue;
        }

        let ip = match AUTH_IP_RE.captures(line) {
            Some(caps) => caps[1].to_string(),
            None => continue,
        };
        let seen = ts.format("%b %e %H:%M:%S").to_string();

        let bucket = if is_accepted { &mut accepted } else { &mut failed };
        let entry = bucket.entry(ip).or_insert((0, String::new()));
        entry.0 += 1;
        entry.1 = seen;
    }

    let into_sorted = |map: HashMap<String, (u64, String)>| -> Vec<LoginEntry> {
        let mut entries: Vec<LoginEntry> = map
            .into_iter()
            .map(|(ip, (count, last_seen))| LoginEntry {
                ip,
                count,
                last_seen,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.ip.cmp(&b.ip)));
        entries
    };

    SshLoginSummary {
        accepted: into_sorted(accepted),
        failed: into_sorted(failed),
    }
}

/// Syslog timestamps carry no year; assume the current one and step back a
/// year if that lands in the future (log lines from late December read in
/// early January).
fn parse_syslog_timestamp(line: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = SYSLOG_TS_RE.captures(line)?;
    let month = match &caps[1] {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    let day: u32 = caps[2].parse().ok()?;
    let time: Vec<u32> = caps[3].split(':').filter_map(|p| p.parse().ok()).collect();
    if time.len() != 3 {
        return None;
    }

    let build = |year: i32| -> Option<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let dt: NaiveDateTime = date.and_hms_opt(time[0], time[1], time[2])?;
        Some(Utc.from_utc_datetime(&dt))
    };

    let ts = build(now.year())?;
    if ts > now {
        build(now.year() - 1)
    } else {
        Some(ts)
    }
}

/// Parse nmap output: open tcp ports plus a best-effort OS guess
pub fn parse_nmap(output: &str) -> ScanResult {
    let mut open_ports = Vec::new();
    let mut os_guess = String::new();

    for line in output.lines() {
        let line = line.trim();
        if line.contains("/tcp") && line.contains("open") {
            if let Some(port) = line.split('/').next().and_then(|p| p.parse().ok()) {
                open_ports.push(port);
            }
        }
        if os_guess.is_empty() && (line.starts_with("OS details:") || line.starts_with("Running:"))
        {
            if let Some((_, info)) = line.split_once(':') {
                os_guess = info.trim().chars().take(30).collect();
            }
        }
    }

    if os_guess.is_empty() && open_ports.contains(&22) {
        os_guess = "Linux".to_string();
    }

    ScanResult {
        open_ports,
        os_guess,
    }
}

/// Parse `dig -x <ip> +short` output: first answer, trailing dot stripped
pub fn parse_dig(output: &str) -> Option<String> {
    let hostname = output.lines().next()?.trim().trim_end_matches('.');
    if hostname.is_empty() {
        None
    } else {
        Some(hostname.to_string())
    }
}

/// Parse `host <ip>` output: the domain-name pointer answer
pub fn parse_host(output: &str) -> Option<String> {
    if !output.contains("domain name pointer") {
        return None;
    }
    HOST_POINTER_RE
        .captures(output)
        .map(|c| c[1].trim().to_string())
}

/// Parse session count and default model from `openclaw status` output,
/// accepting either JSON or plain text
pub fn parse_status_overview(output: &str) -> (u32, String) {
    if let Ok(data) = serde_json::from_str::<serde_json::Value>(output) {
        let sessions = data
            .get("sessions")
            .or_else(|| data.get("active_sessions"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;
        let model = data
            .get("model")
            .or_else(|| data.get("default_model"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        return (sessions, model);
    }

    let mut sessions = 0;
    let mut model = "unknown".to_string();
    for line in output.lines() {
        let lower = line.to_lowercase();
        if lower.contains("session") {
            if let Some(n) = line
                .split_whitespace()
                .find_map(|w| w.parse::<u32>().ok())
            {
                sessions = n;
            }
        }
        if lower.contains("model") {
            if let Some((_, value)) = line.split_once(':') {
                model = value.trim().to_string();
            }
        }
    }
    (sessions, model)
}

/// Parse the channel table out of `openclaw status` box-drawing output
pub fn parse_channels(output: &str) -> Vec<ChannelStatus> {
    let mut channels = Vec::new();
    let mut in_channels = false;

    for line in output.lines() {
        if line.contains("Channels") && !line.contains('│') {
            in_channels = true;
            continue;
        }
        if !in_channels {
            continue;
        }
        let trimmed = line.trim();
        if !trimmed.is_empty()
            && !trimmed.starts_with(['│', '├', '└', '┌', '─'])
            && (trimmed.contains("Sessions")
                || trimmed.contains("Security")
                || trimmed.contains("FAQ"))
        {
            break;
        }
        if let Some(caps) = CHANNEL_ROW_RE.captures(line) {
            let name = caps[1].trim().to_string();
            if name == "Channel" || name.starts_with('─') {
                continue;
            }
            channels.push(ChannelStatus {
                name,
                enabled: caps[2].trim().to_string(),
                state: caps[3].trim().to_string(),
                detail: caps[4].trim().to_string(),
            });
        }
    }
    channels
}

/// Parse update availability from `openclaw status` overview lines
pub fn parse_update_status(output: &str) -> UpdateStatus {
    let mut status = UpdateStatus::default();
    for line in output.lines() {
        if line.contains("Update") && line.contains("available") {
            status.available = true;
            if let Some(caps) = UPDATE_VERSION_RE.captures(line) {
                status.latest = caps[1].to_string();
            }
        }
        if line.contains("Gateway") && line.contains("app ") {
            if let Some(caps) = APP_VERSION_RE.captures(line) {
                status.current = caps[1].to_string();
            }
        }
    }
    status
}

/// Extract an HH:MM display time from a log line, if it carries an
/// ISO-ish timestamp
pub fn log_line_time(line: &str) -> Option<String> {
    LOG_TS_RE.captures(line).map(|c| c[2].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parse_size_si_and_binary() {
        assert_eq!(parse_size_bytes("1K"), Some(1_000));
        assert_eq!(parse_size_bytes("1Ki"), Some(1_024));
        assert_eq!(parse_size_bytes("1M"), Some(1_000_000));
        assert_eq!(parse_size_bytes("1Mi"), Some(1_048_576));
        assert_eq!(parse_size_bytes("2G"), Some(2_000_000_000));
        assert_eq!(parse_size_bytes("1T"), Some(1_000_000_000_000));
    }

    #[test]
    fn test_parse_size_binary_equivalence() {
        // 1024Ki and 1Mi are the same number of bytes.
        assert_eq!(parse_size_bytes("1024Ki"), parse_size_bytes("1Mi"));
    }

    #[test]
    fn test_parse_size_bare_and_fractional() {
        assert_eq!(parse_size_bytes("512"), Some(512));
        assert_eq!(parse_size_bytes("1.5Ki"), Some(1_536));
        assert_eq!(parse_size_bytes(" 3.2G "), Some(3_200_000_000));
    }

    #[test]
    fn test_parse_size_unknown_unit_is_sentinel() {
        assert_eq!(parse_size_bytes("5X"), None);
        assert_eq!(parse_size_bytes("5Xi"), None);
        assert_eq!(parse_size_bytes("garbage"), None);
        assert_eq!(parse_size_bytes(""), None);
        assert_eq!(parse_size_bytes("-1K"), None);
    }

    #[test]
    fn test_parse_free_gi_values() {
        let output = "\
               total        used        free      shared  buff/cache   available
Mem:           8.0Gi       7.4Gi       0.2Gi       0.0Ki       0.4Gi       0.3Gi
Swap:          2.0Gi       0.0Ki       2.0Gi";
        let (used_mb, total_mb) = parse_free(output).unwrap();
        // 7.4Gi is roughly 7577 MB.
        assert!((used_mb - 7577.6).abs() < 1.0);
        assert!((total_mb - 8192.0).abs() < 1.0);
        assert!(used_mb / total_mb > 0.9);
    }

    #[test]
    fn test_parse_free_garbage() {
        assert_eq!(parse_free("no memory here"), None);
    }

    #[test]
    fn test_parse_df() {
        let output = "\
Filesystem      Size  Used Avail Use% Mounted on
/dev/vda1        40G   12G   26G  32% /";
        let (used, total, percent) = parse_df(output).unwrap();
        assert_eq!(used, 12.0);
        assert_eq!(total, 40.0);
        assert_eq!(percent, 32.0);
    }

    #[test]
    fn test_parse_uptime() {
        let output =
            " 10:14:32 up 12 days,  3:42,  2 users,  load average: 0.52, 0.58, 0.59";
        let (load, uptime) = parse_uptime(output);
        assert_eq!(load, [0.52, 0.58, 0.59]);
        assert_eq!(uptime, "12 days,  3:42");
    }

    #[test]
    fn test_cpu_percent_between() {
        let prev = vec![100, 0, 50, 800, 50, 0, 0];
        let current = vec![200, 0, 100, 1500, 100, 0, 0];
        // total diff 900, idle diff 750 -> 16.67% busy
        let pct = cpu_percent_between(&prev, &current).unwrap();
        assert!((pct - 16.666).abs() < 0.01);
    }

    #[test]
    fn test_parse_agents_list_with_default() {
        let output = "\
- main (default) (galactic)
  Model: anthropic/claude-opus-4
  Workspace: ~/agents/main
- rentalops
  Model: anthropic/claude-sonnet-4
  Workspace: ~/agents/rentalops
- raven
  Model: anthropic/claude-sonnet-4
  Workspace: ~/agents/raven";
        let agents = parse_agents_list(output);
        assert_eq!(agents.len(), 3);
        assert_eq!(agents[0].name, "main");
        assert!(agents[0].is_default);
        assert_eq!(agents[0].model, "opus-4");
        assert!(!agents[1].is_default);
        assert!(!agents[2].is_default);
        assert_eq!(agents[2].workspace, "~/agents/raven");
    }

    #[test]
    fn test_apply_status_tokens_fleet() {
        let mut agents = parse_agents_list(
            "- main (default)\n- rentalops\n- raven\n",
        );
        let status = "\
agent:main:a1 opus 42k/80k (52%)
agent:main:a2 opus 42k/80k (52%)
agent:main:a3 opus 42k/80k (52%)
agent:rentalops:b1 sonnet 20k/80k (25%)
agent:rentalops:b2 sonnet 20k/80k (25%)
agent:rentalops:b3 sonnet 15k/80k (18%)
agent:rentalops:b4 sonnet 10k/80k (12%)
agent:raven:c1 sonnet 40k/80k (50%)
agent:raven:c2 sonnet 40k/80k (50%)
agent:raven:c3 sonnet 40k/80k (50%)
agent:raven:c4 sonnet 40k/80k (50%)
agent:raven:c5 sonnet 8k/80k (10%)";
        apply_status_tokens(&mut agents, status);

        assert_eq!(agents[0].sessions, 3);
        assert_eq!(agents[0].tokens_used, 126_000);
        assert_eq!(agents[1].sessions, 4);
        assert_eq!(agents[1].tokens_used, 65_000);
        assert_eq!(agents[2].sessions, 5);
        assert_eq!(agents[2].tokens_used, 168_000);

        let total_sessions: u32 = agents.iter().map(|a| a.sessions).sum();
        let total_tokens: u64 = agents.iter().map(|a| a.tokens_used).sum();
        assert_eq!(total_sessions, 12);
        assert_eq!(total_tokens, 359_000);
    }

    fn cron_row(
        id: &str,
        name: &str,
        schedule: &str,
        next: &str,
        last: &str,
        status: &str,
        agent: &str,
    ) -> String {
        format!(
            "{:<6}{:<26}{:<14}{:<11}{:<11}{:<10}{}",
            id, name, schedule, next, last, status, agent
        )
    }

    #[test]
    fn test_parse_cron_list() {
        let output = [
            cron_row("ID", "Name", "Schedule", "Next", "Last", "Status", "Agent"),
            cron_row(
                "a1b2",
                "morning-brief.........",
                "0 8 * * *",
                "08:00",
                "07:00",
                "ok",
                "main",
            ),
            cron_row(
                "c3d4",
                "backup-sync...........",
                "30 9 * * *",
                "09:30",
                "-",
                "Error",
                "rentalops",
            ),
        ]
        .join("\n");

        let jobs = parse_cron_list(&output);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name, "morning-brief");
        assert_eq!(jobs[0].status, CronStatus::Ok);
        assert_eq!(jobs[0].next_run, "08:00");
        assert_eq!(jobs[1].status, CronStatus::Error);
        assert_eq!(jobs[1].last_run, "");
        assert_eq!(jobs[1].agent, "rentalops");
    }

    #[test]
    fn test_parse_cron_list_errors_column() {
        let row = |id: &str, name: &str, sched: &str, next: &str, last: &str, status: &str, errors: &str, agent: &str| {
            format!(
                "{:<6}{:<20}{:<12}{:<10}{:<10}{:<10}{:<9}{}",
                id, name, sched, next, last, status, errors, agent
            )
        };
        let output = [
            row("ID", "Name", "Schedule", "Next", "Last", "Status", "Errors", "Agent"),
            row("x1", "nightly", "0 2 * * *", "02:00", "01:00", "error", "4", "main"),
        ]
        .join("\n");

        let jobs = parse_cron_list(&output);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].consecutive_errors, 4);
        assert_eq!(jobs[0].agent, "main");
    }

    #[test]
    fn test_parse_cron_list_skips_doctor_noise() {
        let output = [
            "Doctor: checking gateway... ok".to_string(),
            "Doctor: checking channels... ok".to_string(),
            String::new(),
            cron_row("ID", "Name", "Schedule", "Next", "Last", "Status", "Agent"),
            cron_row("x1", "nightly", "0 2 * * *", "02:00", "01:00", "running", "main"),
        ]
        .join("\n");
        let jobs = parse_cron_list(&output);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, CronStatus::Running);
    }

    #[test]
    fn test_parse_cron_list_no_header() {
        assert!(parse_cron_list("nothing useful").is_empty());
    }

    #[test]
    fn test_parse_ps() {
        let output = "\
USER         PID %CPU %MEM    VSZ   RSS TTY      STAT START   TIME COMMAND
root        1201 42.0  3.1 123456 65536 ?        Ssl  09:00   1:23 /usr/bin/openclaw-gateway --port 8080
spacetru    2222 12.5  1.0  56789 12345 ?        S    09:05   0:10 python3 /home/spacetrucker/bot.py";
        let procs = parse_ps(output, 5);
        assert_eq!(procs.len(), 2);
        assert_eq!(procs[0].pid, "1201");
        assert_eq!(procs[0].cpu, "42.0");
        assert_eq!(procs[0].command, "openclaw-gateway --p");
        assert_eq!(procs[1].user, "spacetru");
    }

    #[test]
    fn test_parse_ss_listening() {
        let output = "\
State   Recv-Q  Send-Q  Local Address:Port  Peer Address:Port Process
LISTEN  0       128     0.0.0.0:22          0.0.0.0:*         users:((\"sshd\",pid=800,fd=3))
LISTEN  0       511     127.0.0.1:8080      0.0.0.0:*         users:((\"gateway\",pid=900,fd=6))";
        let ports = parse_ss_listening(output);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].port, 22);
        assert_eq!(ports[0].service, "sshd");
        assert_eq!(ports[1].port, 8080);
        assert_eq!(ports[1].service, "gateway");
    }

    #[test]
    fn test_parse_ss_peers_excludes_local() {
        let output = "\
State   Recv-Q  Send-Q  Local Address:Port  Peer Address:Port  Process
ESTAB   0       0       10.0.0.5:22         174.224.243.131:50022
ESTAB   0       0       10.0.0.5:22         174.224.243.131:50023
ESTAB   0       0       127.0.0.1:8080      127.0.0.1:41000
ESTAB   0       0       [::1]:9090          [::1]:42000
ESTAB   0       0       10.0.0.5:443        [2a01:4f8::1]:443
ESTAB   0       0       10.0.0.5:443        169.254.1.1:80";
        let peers = parse_ss_peers(output);
        assert_eq!(peers.get("174.224.243.131"), Some(&2));
        assert_eq!(peers.get("2a01:4f8::1"), Some(&1));
        assert!(!peers.contains_key("127.0.0.1"));
        assert!(!peers.contains_key("::1"));
        assert!(!peers.contains_key("169.254.1.1"));
        assert_eq!(peers.len(), 2);
    }

    fn auth_line(ts: DateTime<Utc>, body: &str) -> String {
        format!("{} host sshd[999]: {}", ts.format("%b %e %H:%M:%S"), body)
    }

    #[test]
    fn test_parse_auth_log_counts_and_window() {
        let now = Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap();
        let recent = now - Duration::hours(2);
        let ancient = now - Duration::hours(30);

        let mut lines = Vec::new();
        for _ in 0..47 {
            lines.push(auth_line(
                recent,
                "Failed password for root from 45.33.32.156 port 22 ssh2",
            ));
        }
        for _ in 0..12 {
            lines.push(auth_line(
                recent,
                "Invalid user admin from 104.248.168.210 port 22",
            ));
        }
        for _ in 0..8 {
            lines.push(auth_line(
                recent,
                "Failed password for root from 91.189.42.11 port 22 ssh2",
            ));
        }
        // Outside the 24h window: must not count.
        lines.push(auth_line(
            ancient,
            "Failed password for root from 8.8.8.8 port 22 ssh2",
        ));
        lines.push(auth_line(
            recent,
            "Accepted publickey for spacetrucker from 10.1.2.3 port 50000",
        ));

        let summary = parse_auth_log(&lines.join("\n"), now);
        assert_eq!(summary.total_failed(), 67);
        assert_eq!(summary.failed.len(), 3);
        assert_eq!(summary.failed[0].ip, "45.33.32.156");
        assert_eq!(summary.failed[0].count, 47);
        assert_eq!(summary.failed[1].count, 12);
        assert_eq!(summary.failed[2].count, 8);
        assert_eq!(summary.accepted.len(), 1);
        assert_eq!(summary.accepted[0].ip, "10.1.2.3");
    }

    #[test]
    fn test_parse_auth_log_year_boundary() {
        // Log written Dec 31, read Jan 1: the entry is only hours old.
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
        let line = "Dec 31 23:30:00 host sshd[1]: Failed password for root from 1.2.3.4 port 22";
        let summary = parse_auth_log(line, now);
        assert_eq!(summary.total_failed(), 1);
    }

    #[test]
    fn test_parse_nmap() {
        let output = "\
Starting Nmap 7.94 ( https://nmap.org )
Nmap scan report for 45.33.32.156
PORT     STATE  SERVICE
22/tcp   open   ssh
80/tcp   open   http
443/tcp  closed https
OS details: Linux 5.4 - 5.15 (Ubuntu or Debian derivative)";
        let scan = parse_nmap(output);
        assert_eq!(scan.open_ports, vec![22, 80]);
        assert_eq!(scan.os_guess.len(), 30);
        assert!(scan.os_guess.starts_with("Linux 5.4"));
    }

    #[test]
    fn test_parse_nmap_ssh_fallback_guess() {
        let output = "PORT   STATE SERVICE\n22/tcp open  ssh";
        let scan = parse_nmap(output);
        assert_eq!(scan.os_guess, "Linux");
    }

    #[test]
    fn test_parse_dig_and_host() {
        assert_eq!(
            parse_dig("ns1.example.com.\n"),
            Some("ns1.example.com".to_string())
        );
        assert_eq!(parse_dig("\n"), None);

        let host_out = "156.32.33.45.in-addr.arpa domain name pointer scanner.example.net.";
        assert_eq!(parse_host(host_out), Some("scanner.example.net".to_string()));
        assert_eq!(parse_host("Host not found"), None);
    }

    #[test]
    fn test_parse_status_overview_json_and_text() {
        let (sessions, model) =
            parse_status_overview(r#"{"sessions": 12, "model": "opus-4"}"#);
        assert_eq!(sessions, 12);
        assert_eq!(model, "opus-4");

        let (sessions, model) = parse_status_overview("Sessions: 7 active\nModel: sonnet-4\n");
        assert_eq!(sessions, 7);
        assert_eq!(model, "sonnet-4");
    }

    #[test]
    fn test_parse_channels() {
        let output = "\
Channels
┌──────────┬─────────┬───────┬────────────────┐
│ Channel  │ Enabled │ State │ Detail         │
│ telegram │ yes     │ OK    │ connected      │
│ slack    │ yes     │ WARN  │ token expiring │
└──────────┴─────────┴───────┴────────────────┘
Sessions
│ agent:main:a1 │";
        let channels = parse_channels(output);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "telegram");
        assert_eq!(channels[0].state, "OK");
        assert_eq!(channels[1].state, "WARN");
        assert_eq!(channels[1].detail, "token expiring");
    }

    #[test]
    fn test_parse_update_status() {
        let output = "\
Overview: update 3.2.0-1 available
Gateway: running, app 3.1.0";
        let status = parse_update_status(output);
        assert!(status.available);
        assert_eq!(status.latest, "3.2.0-1");
        assert_eq!(status.current, "3.1.0");
    }

    #[test]
    fn test_log_line_time() {
        assert_eq!(
            log_line_time("2026-08-02T10:15:33Z gateway started"),
            Some("10:15".to_string())
        );
        assert_eq!(log_line_time("no timestamp here"), None);
    }
}
