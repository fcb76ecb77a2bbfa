//! Tiered collectors: one capability per data source
//!
//! A collector composes the runner, a parser, and a store write. It is safe
//! to run concurrently with other collectors but never with itself; the
//! scheduler guarantees non-reentrance per tier. External failures stop at
//! the collector boundary as a `Degraded` or `Failed` outcome.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gcic_core::constants::{
    self, control_keys, sitrep_keys, ATTACKER_SCAN_LIMIT, COMMAND_TIMEOUT, NMAP_TIMEOUT,
    WRITE_FAILURE_DEGRADE_THRESHOLD,
};
use gcic_core::{
    ActionItem, ActivityEvent, AgentRecord, CronStatus, EventLevel, NetworkActivity, Result,
    SecurityStatus, ServerHealth, Severity, SshLoginSummary, TopIp, UpdateStatus,
};
use gcic_db::{CacheLookup, Database};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::geo::GeoClient;
use crate::parse;
use crate::runner::{CommandOutcome, CommandRunner};
use crate::singleflight::SingleFlight;

/// Collection schedule bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Medium,
    Slow,
    Glacial,
}

impl Tier {
    pub fn interval(&self) -> Duration {
        match self {
            Tier::Fast => constants::TIER_FAST,
            Tier::Medium => constants::TIER_MEDIUM,
            Tier::Slow => constants::TIER_SLOW,
            Tier::Glacial => constants::TIER_GLACIAL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Fast => "fast",
            Tier::Medium => "medium",
            Tier::Slow => "slow",
            Tier::Glacial => "glacial",
        }
    }

    pub const ALL: [Tier; 4] = [Tier::Fast, Tier::Medium, Tier::Slow, Tier::Glacial];
}

/// How one collector invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorOutcome {
    /// Collected and recorded
    Ok,
    /// Source unavailable this tick (missing binary, timeout, unusable
    /// output); nothing written, last-known values stay in the store
    Degraded,
    /// Store write failed; nothing written, logged as an error
    Failed,
}

/// Shared state handed to every collector run
pub struct CollectorContext {
    pub runner: CommandRunner,
    pub db: Database,
    pub geo: GeoClient,
    pub flights: SingleFlight,
    nmap_active: AtomicUsize,
    write_failures: AtomicU32,
    cpu_prev: Mutex<Option<Vec<u64>>>,
    auth_log_path: PathBuf,
    platform_log_dir: PathBuf,
}

impl CollectorContext {
    pub fn new(db: Database) -> Self {
        let platform_log_dir = dirs::home_dir()
            .map(|h| h.join(".openclaw").join("logs"))
            .unwrap_or_else(|| PathBuf::from(".openclaw/logs"));
        Self {
            runner: CommandRunner::new(),
            db,
            geo: GeoClient::new(),
            flights: SingleFlight::new(),
            nmap_active: AtomicUsize::new(0),
            write_failures: AtomicU32::new(0),
            cpu_prev: Mutex::new(None),
            auth_log_path: PathBuf::from("/var/log/auth.log"),
            platform_log_dir,
        }
    }

    #[cfg(test)]
    pub fn with_paths(mut self, auth_log: PathBuf, platform_logs: PathBuf) -> Self {
        self.auth_log_path = auth_log;
        self.platform_log_dir = platform_logs;
        self
    }

    pub fn now(&self) -> f64 {
        constants::now_epoch()
    }

    /// Current nmap-active set count
    pub fn nmap_active(&self) -> usize {
        self.nmap_active.load(Ordering::SeqCst)
    }

    /// Map a store-write result to an outcome, tracking the consecutive
    /// failure streak that flips the daemon to degraded.
    pub async fn record_result(&self, name: &str, result: Result<()>) -> CollectorOutcome {
        match result {
            Ok(()) => {
                let streak = self.write_failures.swap(0, Ordering::SeqCst);
                if streak >= WRITE_FAILURE_DEGRADE_THRESHOLD {
                    let _ = self.db.set_control(control_keys::DAEMON_STATE, "ok").await;
                }
                CollectorOutcome::Ok
            }
            Err(e) => {
                error!("{}: store write failed: {}", name, e);
                let streak = self.write_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if streak == WRITE_FAILURE_DEGRADE_THRESHOLD {
                    warn!("{} consecutive write failures, daemon degraded", streak);
                    let _ = self
                        .db
                        .set_control(control_keys::DAEMON_STATE, "degraded")
                        .await;
                }
                CollectorOutcome::Failed
            }
        }
    }

    /// Mirror the in-process nmap counter into the config table so the
    /// dashboard process can read it.
    async fn sync_nmap_flag(&self) {
        let count = self.nmap_active.load(Ordering::SeqCst);
        let _ = self
            .db
            .set_control(control_keys::NMAP_ACTIVE, &count.to_string())
            .await;
    }
}

/// RAII increment of the nmap-active set count
struct NmapGuard<'a> {
    ctx: &'a CollectorContext,
}

impl<'a> NmapGuard<'a> {
    fn acquire(ctx: &'a CollectorContext) -> Self {
        ctx.nmap_active.fetch_add(1, Ordering::SeqCst);
        Self { ctx }
    }
}

impl Drop for NmapGuard<'_> {
    fn drop(&mut self) {
        self.ctx.nmap_active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A data-source collector with a fixed tier assignment
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;
    fn tier(&self) -> Tier;
    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome;
}

/// The full collector set, tier assignments per the scheduler table
pub fn registry() -> Vec<Arc<dyn Collector>> {
    vec![
        Arc::new(ServerHealthCollector),
        Arc::new(TopProcessesCollector),
        Arc::new(CronCollector),
        Arc::new(ActivityLogCollector),
        Arc::new(NetworkCollector),
        Arc::new(AgentsCollector),
        Arc::new(PlatformStatusCollector),
        Arc::new(SecurityCollector),
        Arc::new(SitrepCollector),
        Arc::new(DnsCollector),
        Arc::new(GeoCollector),
        Arc::new(NmapCollector),
    ]
}

fn source_unusable(outcome: CommandOutcome) -> bool {
    matches!(outcome, CommandOutcome::Missing | CommandOutcome::Timeout)
}

/// Launch every collector in the slice in parallel and join the tick.
/// A panicking collector is logged and skipped; it never takes the tier
/// loop down with it.
pub async fn run_tier(
    ctx: &Arc<CollectorContext>,
    collectors: &[Arc<dyn Collector>],
) -> Vec<(&'static str, CollectorOutcome)> {
    let mut handles = Vec::with_capacity(collectors.len());
    for collector in collectors {
        let collector = Arc::clone(collector);
        let ctx = Arc::clone(ctx);
        handles.push(tokio::spawn(async move {
            (collector.name(), collector.run(&ctx).await)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok((name, outcome)) => {
                match outcome {
                    CollectorOutcome::Ok => debug!("{}: ok", name),
                    CollectorOutcome::Degraded => warn!("{}: degraded, keeping last known", name),
                    CollectorOutcome::Failed => {}
                }
                results.push((name, outcome));
            }
            Err(e) => error!("collector task panicked: {}", e),
        }
    }
    results
}

/// Reverse-resolve an IP through the DNS cache with single-flight
/// coalescing; at most one external lookup per key per TTL.
pub async fn resolve_hostname(ctx: &CollectorContext, ip: &str) -> String {
    let cache = ctx.db.dns_cache();
    let now = ctx.now();

    if let Ok(CacheLookup::Fresh(hostname)) = cache.get(ip, now).await {
        return hostname;
    }

    let _flight = ctx.flights.acquire(ip).await;
    if let Ok(CacheLookup::Fresh(hostname)) = cache.get(ip, ctx.now()).await {
        return hostname;
    }

    let dig = ctx
        .runner
        .run(
            &["dig", "-x", ip, "+short", "+time=2", "+tries=1"],
            constants::HTTP_TIMEOUT,
        )
        .await;
    let mut hostname = if dig.usable() {
        parse::parse_dig(&dig.stdout)
    } else {
        None
    };

    if hostname.is_none() {
        let host = ctx.runner.run(&["host", ip], constants::HTTP_TIMEOUT).await;
        if host.usable() {
            hostname = parse::parse_host(&host.stdout);
        }
    }

    let hostname = hostname.unwrap_or_else(|| "unknown".to_string());
    if let Err(e) = cache.put(ip, &hostname, ctx.now()).await {
        warn!("dns cache write failed for {}: {}", ip, e);
    }
    hostname
}

/// Top failed-SSH source IPs from the stored login summary, stale included
async fn attacker_targets(ctx: &CollectorContext) -> Vec<String> {
    let lookup: CacheLookup<SshLoginSummary> = match ctx
        .db
        .sitrep_cache()
        .get_json(sitrep_keys::SSH_SUMMARY, ctx.now())
        .await
    {
        Ok(l) => l,
        Err(_) => return Vec::new(),
    };
    lookup
        .into_value()
        .map(|summary| {
            summary
                .failed
                .iter()
                .take(ATTACKER_SCAN_LIMIT)
                .map(|e| e.ip.clone())
                .collect()
        })
        .unwrap_or_default()
}

// ── Fast tier ──

/// free/df/uptime plus a /proc/stat CPU delta against the previous tick
pub struct ServerHealthCollector;

#[async_trait]
impl Collector for ServerHealthCollector {
    fn name(&self) -> &'static str {
        "server_health"
    }

    fn tier(&self) -> Tier {
        Tier::Fast
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let free = ctx.runner.run(&["free", "-h"], COMMAND_TIMEOUT).await;
        let df = ctx.runner.run(&["df", "-h", "/"], COMMAND_TIMEOUT).await;
        let uptime = ctx.runner.run(&["uptime"], COMMAND_TIMEOUT).await;

        if source_unusable(free.outcome)
            && source_unusable(df.outcome)
            && source_unusable(uptime.outcome)
        {
            return CollectorOutcome::Degraded;
        }

        let mut health = ServerHealth::default();
        if let Some((used_mb, total_mb)) = parse::parse_free(&free.stdout) {
            health.mem_used_mb = used_mb;
            health.mem_total_mb = total_mb;
        }
        if let Some((used_gb, total_gb, _percent)) = parse::parse_df(&df.stdout) {
            health.disk_used_gb = used_gb;
            health.disk_total_gb = total_gb;
        }
        let (load, uptime_str) = parse::parse_uptime(&uptime.stdout);
        health.load = load;
        health.uptime = uptime_str;

        // CPU needs two /proc/stat readings; the first tick records zero.
        if let Ok(stat) = tokio::fs::read_to_string("/proc/stat").await {
            if let Some(current) = parse::parse_proc_stat(&stat) {
                let mut prev = ctx.cpu_prev.lock().await;
                if let Some(prev_fields) = prev.as_ref() {
                    if let Some(pct) = parse::cpu_percent_between(prev_fields, &current) {
                        health.cpu_percent = pct;
                    }
                }
                *prev = Some(current);
            }
        }

        let result = ctx.db.recorder().record_server(ctx.now(), &health).await;
        ctx.record_result(self.name(), result).await
    }
}

/// Top five processes by CPU from ps
pub struct TopProcessesCollector;

#[async_trait]
impl Collector for TopProcessesCollector {
    fn name(&self) -> &'static str {
        "top_processes"
    }

    fn tier(&self) -> Tier {
        Tier::Fast
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let output = ctx
            .runner
            .run(&["ps", "aux", "--sort=-%cpu"], COMMAND_TIMEOUT)
            .await;
        if !output.usable() {
            return CollectorOutcome::Degraded;
        }

        let processes = parse::parse_ps(&output.stdout, 5);
        let result = ctx
            .db
            .sitrep_cache()
            .put_json(sitrep_keys::TOP_PROCESSES, &processes, ctx.now())
            .await;
        ctx.record_result(self.name(), result).await
    }
}

// ── Medium tier ──

/// Scheduled-job status from the platform cron list
pub struct CronCollector;

#[async_trait]
impl Collector for CronCollector {
    fn name(&self) -> &'static str {
        "cron_jobs"
    }

    fn tier(&self) -> Tier {
        Tier::Medium
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let output = ctx
            .runner
            .run(&["openclaw", "cron", "list"], COMMAND_TIMEOUT)
            .await;
        if !output.usable() {
            return CollectorOutcome::Degraded;
        }

        let jobs = parse::parse_cron_list(&output.stdout);
        if jobs.is_empty() {
            debug!("cron list produced no jobs");
            return CollectorOutcome::Degraded;
        }

        let result = ctx.db.recorder().record_cron(ctx.now(), &jobs).await;
        ctx.record_result(self.name(), result).await
    }
}

/// Recent activity: SSH events, platform logs, cron completions. Split
/// into `recent` and `errors` streams for the Activity panel.
pub struct ActivityLogCollector;

impl ActivityLogCollector {
    async fn ssh_events(&self, ctx: &CollectorContext) -> Vec<ActivityEvent> {
        let content = tokio::fs::read_to_string(&ctx.auth_log_path)
            .await
            .unwrap_or_default();
        content
            .lines()
            .filter(|l| l.contains("Accepted") || l.contains("session opened"))
            .rev()
            .take(10)
            .map(|line| {
                let (time, message) = split_syslog_prefix(line);
                ActivityEvent {
                    message: message.chars().take(80).collect(),
                    time,
                    source: "ssh".to_string(),
                    level: EventLevel::Info,
                }
            })
            .collect()
    }

    async fn platform_events(&self, ctx: &CollectorContext) -> Vec<ActivityEvent> {
        let mut lines: Vec<String> = Vec::new();

        if let Ok(mut entries) = tokio::fs::read_dir(&ctx.platform_log_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().map(|e| e == "log").unwrap_or(false) {
                    if let Ok(content) = tokio::fs::read_to_string(&path).await {
                        lines.extend(content.lines().rev().take(20).map(String::from));
                    }
                }
            }
        }

        if lines.is_empty() {
            let output = ctx
                .runner
                .run(&["openclaw", "logs", "--limit", "20"], COMMAND_TIMEOUT)
                .await;
            if output.usable() {
                lines = output.stdout.lines().map(String::from).collect();
            }
        }

        lines
            .iter()
            .filter(|l| !l.trim().is_empty() && !l.starts_with("==>"))
            .take(20)
            .map(|line| ActivityEvent {
                time: parse::log_line_time(line).unwrap_or_default(),
                message: line.trim().chars().take(80).collect(),
                source: "openclaw".to_string(),
                level: EventLevel::classify(line),
            })
            .collect()
    }
}

#[async_trait]
impl Collector for ActivityLogCollector {
    fn name(&self) -> &'static str {
        "activity_log"
    }

    fn tier(&self) -> Tier {
        Tier::Medium
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let mut recent = self.ssh_events(ctx).await;
        recent.extend(self.platform_events(ctx).await);
        recent.truncate(50);

        let mut errors: Vec<ActivityEvent> = recent
            .iter()
            .filter(|e| e.level == EventLevel::Error)
            .cloned()
            .collect();

        // Cron failures and heavy SSH offenders come from the store, not
        // fresh commands; this collector stays read-only toward them.
        if let Ok(jobs) = ctx.db.trends().latest_cron().await {
            for snapshot in jobs {
                if snapshot.job.status == CronStatus::Error {
                    errors.push(ActivityEvent {
                        time: tail_chars(&snapshot.job.last_run, 5),
                        message: format!("{}: delivery failed", snapshot.job.name),
                        source: "cron".to_string(),
                        level: EventLevel::Error,
                    });
                }
            }
        }
        if let Ok(lookup) = ctx
            .db
            .sitrep_cache()
            .get_json::<SshLoginSummary>(sitrep_keys::SSH_SUMMARY, ctx.now())
            .await
        {
            if let Some(summary) = lookup.into_value() {
                for entry in summary.failed.iter().filter(|e| e.count >= 5) {
                    errors.push(ActivityEvent {
                        time: entry.last_seen.clone(),
                        message: format!("{} failed attempts from {}", entry.count, entry.ip),
                        source: "ssh".to_string(),
                        level: EventLevel::Error,
                    });
                }
            }
        }

        let now = ctx.now();
        let cache = ctx.db.sitrep_cache();
        let result = async {
            cache
                .put_json(sitrep_keys::ACTIVITY_RECENT, &recent, now)
                .await?;
            cache
                .put_json(sitrep_keys::ACTIVITY_ERRORS, &errors, now)
                .await
        }
        .await;
        ctx.record_result(self.name(), result).await
    }
}

/// Connection counts and peer IPs from `ss -tnp`, with the top peers
/// reverse-resolved through the DNS cache
pub struct NetworkCollector;

#[async_trait]
impl Collector for NetworkCollector {
    fn name(&self) -> &'static str {
        "network"
    }

    fn tier(&self) -> Tier {
        Tier::Medium
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let output = ctx.runner.run(&["ss", "-tnp"], COMMAND_TIMEOUT).await;
        if source_unusable(output.outcome) {
            return CollectorOutcome::Degraded;
        }

        let peers = parse::parse_ss_peers(&output.stdout);
        let activity = NetworkActivity {
            active_connections: peers.values().sum(),
            unique_ips: peers.len() as u64,
            peers: peers.clone(),
        };

        let mut sorted: Vec<(String, u64)> = peers.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut top_ips = Vec::new();
        for (ip, count) in sorted.into_iter().take(3) {
            let hostname = resolve_hostname(ctx, &ip).await;
            top_ips.push(TopIp {
                ip,
                count,
                hostname,
            });
        }

        let now = ctx.now();
        let result = async {
            ctx.db.recorder().record_network(now, &activity).await?;
            ctx.db
                .sitrep_cache()
                .put_json(sitrep_keys::TOP_IPS, &top_ips, now)
                .await
        }
        .await;
        ctx.record_result(self.name(), result).await
    }
}

// ── Slow tier ──

/// Agent fleet: list, per-workspace storage, session/token usage
pub struct AgentsCollector;

#[async_trait]
impl Collector for AgentsCollector {
    fn name(&self) -> &'static str {
        "agents"
    }

    fn tier(&self) -> Tier {
        Tier::Slow
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let output = ctx
            .runner
            .run(&["openclaw", "agents", "list"], COMMAND_TIMEOUT)
            .await;
        if !output.usable() {
            return CollectorOutcome::Degraded;
        }

        let mut agents: Vec<AgentRecord> = parse::parse_agents_list(&output.stdout);
        if agents.is_empty() {
            return CollectorOutcome::Degraded;
        }

        for agent in agents.iter_mut() {
            if agent.workspace.is_empty() {
                continue;
            }
            let expanded = expand_home(&agent.workspace);
            let du = ctx
                .runner
                .run(&["du", "-sh", expanded.as_str()], COMMAND_TIMEOUT)
                .await;
            if du.usable() {
                if let Some(size) = du.stdout.split_whitespace().next() {
                    agent.storage_bytes = parse::parse_size_bytes(size).unwrap_or(0);
                }
            }
        }

        let status = ctx
            .runner
            .run(&["openclaw", "status"], COMMAND_TIMEOUT)
            .await;
        if status.usable() {
            parse::apply_status_tokens(&mut agents, &status.stdout);
        }

        let result = ctx.db.recorder().record_agents(ctx.now(), &agents).await;
        ctx.record_result(self.name(), result).await
    }
}

/// Gateway/session/version overview from the platform CLI
pub struct PlatformStatusCollector;

#[async_trait]
impl Collector for PlatformStatusCollector {
    fn name(&self) -> &'static str {
        "platform_status"
    }

    fn tier(&self) -> Tier {
        Tier::Slow
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let status_out = ctx
            .runner
            .run(&["openclaw", "status"], COMMAND_TIMEOUT)
            .await;
        if source_unusable(status_out.outcome) {
            return CollectorOutcome::Degraded;
        }

        let mut status = gcic_core::PlatformStatus::default();
        if status_out.usable() {
            let (sessions, model) = parse::parse_status_overview(&status_out.stdout);
            status.sessions = sessions;
            status.model = model;
        }

        let gateway = ctx
            .runner
            .run(&["openclaw", "gateway", "status"], COMMAND_TIMEOUT)
            .await;
        if gateway.ok() {
            status.gateway = if gateway.stdout.to_lowercase().contains("running") {
                "running".to_string()
            } else {
                "stopped".to_string()
            };
        }

        let version = ctx
            .runner
            .run(&["openclaw", "--version"], COMMAND_TIMEOUT)
            .await;
        if version.usable() {
            status.version = version.stdout.lines().next().unwrap_or("").trim().to_string();
        }

        let result = ctx
            .db
            .sitrep_cache()
            .put_json(sitrep_keys::PLATFORM_STATUS, &status, ctx.now())
            .await;
        ctx.record_result(self.name(), result).await
    }
}

/// Security posture: auth-log summary, listening ports, firewall and
/// root-login policy
pub struct SecurityCollector;

#[async_trait]
impl Collector for SecurityCollector {
    fn name(&self) -> &'static str {
        "security"
    }

    fn tier(&self) -> Tier {
        Tier::Slow
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let ss = ctx.runner.run(&["ss", "-tlnp"], COMMAND_TIMEOUT).await;
        if source_unusable(ss.outcome) {
            return CollectorOutcome::Degraded;
        }
        let ports = parse::parse_ss_listening(&ss.stdout);

        let auth_content = tokio::fs::read_to_string(&ctx.auth_log_path)
            .await
            .unwrap_or_default();
        let now_secs = ctx.now();
        let now_utc = Utc
            .timestamp_opt(now_secs as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let summary = parse::parse_auth_log(&auth_content, now_utc);

        let ufw = ctx.runner.run(&["ufw", "status"], COMMAND_TIMEOUT).await;
        let ufw_lower = ufw.stdout.to_lowercase();
        let ufw_active = ufw.ok() && ufw_lower.contains("active") && !ufw_lower.contains("inactive");

        let fail2ban = ctx
            .runner
            .run(&["systemctl", "is-active", "fail2ban"], COMMAND_TIMEOUT)
            .await;
        let fail2ban_active = fail2ban.stdout.trim() == "active";

        let sshd_config = tokio::fs::read_to_string("/etc/ssh/sshd_config")
            .await
            .unwrap_or_default();
        let root_login_enabled = !sshd_config.lines().any(|l| {
            let l = l.trim();
            l.starts_with("PermitRootLogin") && l.to_lowercase().contains("no")
        });

        let status = SecurityStatus {
            ssh_intrusions_24h: summary.total_failed(),
            ports,
            ufw_active,
            fail2ban_active,
            root_login_enabled,
        };

        let result = async {
            ctx.db.recorder().record_security(now_secs, &status).await?;
            ctx.db
                .sitrep_cache()
                .put_json(sitrep_keys::SSH_SUMMARY, &summary, now_secs)
                .await
        }
        .await;
        ctx.record_result(self.name(), result).await
    }
}

/// SITREP: channel health, update availability, aggregated action items.
/// Action items derive from the store so this stays consistent with what
/// the panels show.
pub struct SitrepCollector;

impl SitrepCollector {
    async fn build_action_items(
        ctx: &CollectorContext,
        channels: &[gcic_core::ChannelStatus],
        update: &UpdateStatus,
    ) -> Vec<ActionItem> {
        let mut items = Vec::new();
        let trends = ctx.db.trends();

        if let Ok(jobs) = trends.latest_cron().await {
            for snapshot in jobs {
                if snapshot.job.status == CronStatus::Error {
                    items.push(ActionItem {
                        severity: Severity::Error,
                        text: format!("{} cron failed", snapshot.job.name),
                    });
                }
            }
        }

        if let Ok(Some((security, _ports))) = trends.latest_security().await {
            if security.ssh_intrusions_24h > 50 {
                items.push(ActionItem {
                    severity: Severity::Error,
                    text: format!("{} SSH intrusion attempts", security.ssh_intrusions_24h),
                });
            }
            let expected_ports = 4;
            if security.ports_open > expected_ports + 2 {
                items.push(ActionItem {
                    severity: Severity::Warn,
                    text: format!(
                        "{} listening ports (expected ~{})",
                        security.ports_open, expected_ports
                    ),
                });
            }
        }

        if update.available {
            items.push(ActionItem {
                severity: Severity::Warn,
                text: format!("OpenClaw update: {}", notblank(&update.latest)),
            });
        }

        for channel in channels {
            if channel.state.to_uppercase() == "WARN" {
                items.push(ActionItem {
                    severity: Severity::Warn,
                    text: format!("{}: {}", channel.name, notblank(&channel.detail)),
                });
            }
        }

        if let Ok(Some(server)) = trends.latest_server().await {
            let disk = server.disk_percent();
            let mem = server.mem_percent();
            if disk > 80.0 {
                items.push(ActionItem {
                    severity: Severity::Warn,
                    text: format!("Disk usage: {:.0}%", disk),
                });
            }
            if mem > 80.0 {
                items.push(ActionItem {
                    severity: Severity::Warn,
                    text: format!("Memory usage: {:.0}%", mem),
                });
            }
            if server.cpu_percent > 90.0 {
                items.push(ActionItem {
                    severity: Severity::Warn,
                    text: format!("CPU usage: {:.0}%", server.cpu_percent),
                });
            }
        }

        items
    }
}

fn notblank(s: &str) -> &str {
    if s.is_empty() {
        "?"
    } else {
        s
    }
}

#[async_trait]
impl Collector for SitrepCollector {
    fn name(&self) -> &'static str {
        "sitrep"
    }

    fn tier(&self) -> Tier {
        Tier::Slow
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let status_out = ctx
            .runner
            .run(&["openclaw", "status"], COMMAND_TIMEOUT)
            .await;
        if source_unusable(status_out.outcome) {
            // Retain cached channel/update state rather than overwriting it
            // with blanks.
            return CollectorOutcome::Degraded;
        }

        let channels = parse::parse_channels(&status_out.stdout);
        let mut update = parse::parse_update_status(&status_out.stdout);
        if update.current.is_empty() {
            let version = ctx
                .runner
                .run(&["openclaw", "--version"], COMMAND_TIMEOUT)
                .await;
            if version.usable() {
                update.current = version.stdout.lines().next().unwrap_or("").trim().to_string();
            }
        }

        let items = Self::build_action_items(ctx, &channels, &update).await;

        let now = ctx.now();
        let cache = ctx.db.sitrep_cache();
        let result = async {
            cache.put_json(sitrep_keys::CHANNELS, &channels, now).await?;
            cache.put_json(sitrep_keys::UPDATE_CHECK, &update, now).await?;
            cache.put_json(sitrep_keys::ACTION_ITEMS, &items, now).await
        }
        .await;
        ctx.record_result(self.name(), result).await
    }
}

// ── Glacial tier ──

/// Reverse-DNS enrichment of the top failed-SSH source IPs
pub struct DnsCollector;

#[async_trait]
impl Collector for DnsCollector {
    fn name(&self) -> &'static str {
        "dns_resolution"
    }

    fn tier(&self) -> Tier {
        Tier::Glacial
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        for ip in attacker_targets(ctx).await {
            let hostname = resolve_hostname(ctx, &ip).await;
            debug!("resolved {} -> {}", ip, hostname);
        }
        CollectorOutcome::Ok
    }
}

/// Geolocation enrichment of the top failed-SSH source IPs
pub struct GeoCollector;

#[async_trait]
impl Collector for GeoCollector {
    fn name(&self) -> &'static str {
        "geolocation"
    }

    fn tier(&self) -> Tier {
        Tier::Glacial
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let cache = ctx.db.geo_cache();
        let mut outcome = CollectorOutcome::Ok;

        for ip in attacker_targets(ctx).await {
            if matches!(cache.get(&ip, ctx.now()).await, Ok(l) if l.is_fresh()) {
                continue;
            }
            let key = format!("geo:{}", ip);
            let _flight = ctx.flights.acquire(&key).await;
            if matches!(cache.get(&ip, ctx.now()).await, Ok(l) if l.is_fresh()) {
                continue;
            }

            match ctx.geo.lookup(&ip).await {
                Ok(info) => {
                    if let Err(e) = cache.put(&ip, &info, ctx.now()).await {
                        warn!("geo cache write failed for {}: {}", ip, e);
                        outcome = CollectorOutcome::Failed;
                    }
                }
                Err(e) => {
                    // Transient HTTP failure: keep the stale row, refetch
                    // next tick.
                    warn!("geo lookup failed for {}: {}", ip, e);
                    outcome = CollectorOutcome::Degraded;
                }
            }
        }
        outcome
    }
}

/// Bounded nmap of the top failed-SSH source IPs; sets the nmap-active
/// flag for the Security panel title while scans are in flight.
pub struct NmapCollector;

#[async_trait]
impl Collector for NmapCollector {
    fn name(&self) -> &'static str {
        "attacker_nmap"
    }

    fn tier(&self) -> Tier {
        Tier::Glacial
    }

    async fn run(&self, ctx: &CollectorContext) -> CollectorOutcome {
        let cache = ctx.db.scan_cache();
        let mut outcome = CollectorOutcome::Ok;

        for ip in attacker_targets(ctx).await {
            if matches!(cache.get(&ip, ctx.now()).await, Ok(l) if l.is_fresh()) {
                continue;
            }

            let guard = NmapGuard::acquire(ctx);
            ctx.sync_nmap_flag().await;

            let output = ctx
                .runner
                .run(&["nmap", "-sT", "--top-ports", "20", ip.as_str()], NMAP_TIMEOUT)
                .await;

            drop(guard);
            ctx.sync_nmap_flag().await;

            if source_unusable(output.outcome) {
                outcome = CollectorOutcome::Degraded;
                break;
            }
            if !output.usable() {
                continue;
            }

            let scan = parse::parse_nmap(&output.stdout);
            debug!("scanned {}: ports={:?}", ip, scan.open_ports);
            if let Err(e) = cache.put(&ip, &scan, ctx.now()).await {
                warn!("scan cache write failed for {}: {}", ip, e);
                outcome = CollectorOutcome::Failed;
            }
        }
        outcome
    }
}

/// Split a syslog line into its "Mon DD HH:MM:SS" prefix and the rest,
/// preserving the original spacing of the prefix
fn split_syslog_prefix(line: &str) -> (String, String) {
    let mut rest = line;
    let mut fields = Vec::with_capacity(3);
    for _ in 0..3 {
        rest = rest.trim_start();
        match rest.find(char::is_whitespace) {
            Some(i) => {
                fields.push(&rest[..i]);
                rest = &rest[i..];
            }
            None => {
                fields.push(rest);
                rest = "";
                break;
            }
        }
    }
    (fields.join(" "), rest.trim().to_string())
}

/// Last `n` characters of a string (HH:MM out of a longer timestamp)
fn tail_chars(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(n);
    chars[start..].iter().collect()
}

fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).display().to_string();
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcic_core::LoginEntry;
    use tempfile::tempdir;

    async fn test_ctx() -> (CollectorContext, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();
        let ctx = CollectorContext::new(db).with_paths(
            dir.path().join("auth.log"),
            dir.path().join("openclaw-logs"),
        );
        (ctx, dir)
    }

    #[test]
    fn test_tier_intervals() {
        assert_eq!(Tier::Fast.interval(), Duration::from_secs(30));
        assert_eq!(Tier::Medium.interval(), Duration::from_secs(120));
        assert_eq!(Tier::Slow.interval(), Duration::from_secs(300));
        assert_eq!(Tier::Glacial.interval(), Duration::from_secs(900));
    }

    #[test]
    fn test_registry_tier_assignment() {
        let registry = registry();
        assert_eq!(registry.len(), 12);

        let names_in = |tier: Tier| -> Vec<&str> {
            registry
                .iter()
                .filter(|c| c.tier() == tier)
                .map(|c| c.name())
                .collect()
        };
        assert_eq!(names_in(Tier::Fast), vec!["server_health", "top_processes"]);
        assert_eq!(
            names_in(Tier::Medium),
            vec!["cron_jobs", "activity_log", "network"]
        );
        assert_eq!(
            names_in(Tier::Slow),
            vec!["agents", "platform_status", "security", "sitrep"]
        );
        assert_eq!(
            names_in(Tier::Glacial),
            vec!["dns_resolution", "geolocation", "attacker_nmap"]
        );
    }

    #[tokio::test]
    async fn test_missing_platform_binary_degrades() {
        // "openclaw" is not installed in the test environment; the agents
        // and cron collectors must degrade without writing rows.
        let (ctx, _dir) = test_ctx().await;

        assert_eq!(AgentsCollector.run(&ctx).await, CollectorOutcome::Degraded);
        assert_eq!(CronCollector.run(&ctx).await, CollectorOutcome::Degraded);

        assert!(ctx.db.trends().latest_agents().await.unwrap().is_empty());
        assert!(ctx.db.trends().latest_cron().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nmap_guard_counts() {
        let (ctx, _dir) = test_ctx().await;
        assert_eq!(ctx.nmap_active(), 0);
        {
            let _outer = NmapGuard::acquire(&ctx);
            let _inner = NmapGuard::acquire(&ctx);
            assert_eq!(ctx.nmap_active(), 2);
        }
        assert_eq!(ctx.nmap_active(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_streak_degrades_daemon() {
        let (ctx, _dir) = test_ctx().await;

        for _ in 0..WRITE_FAILURE_DEGRADE_THRESHOLD {
            let outcome = ctx
                .record_result("test", Err(gcic_core::Error::Db("disk full".into())))
                .await;
            assert_eq!(outcome, CollectorOutcome::Failed);
        }
        assert_eq!(
            ctx.db
                .get_control(control_keys::DAEMON_STATE)
                .await
                .unwrap()
                .as_deref(),
            Some("degraded")
        );

        // One successful write clears the streak and the state.
        let outcome = ctx.record_result("test", Ok(())).await;
        assert_eq!(outcome, CollectorOutcome::Ok);
        assert_eq!(
            ctx.db
                .get_control(control_keys::DAEMON_STATE)
                .await
                .unwrap()
                .as_deref(),
            Some("ok")
        );
    }

    #[tokio::test]
    async fn test_attacker_targets_from_summary() {
        let (ctx, _dir) = test_ctx().await;

        let summary = SshLoginSummary {
            accepted: vec![],
            failed: vec![
                LoginEntry {
                    ip: "45.33.32.156".into(),
                    count: 47,
                    last_seen: String::new(),
                },
                LoginEntry {
                    ip: "104.248.168.210".into(),
                    count: 12,
                    last_seen: String::new(),
                },
                LoginEntry {
                    ip: "91.189.42.11".into(),
                    count: 8,
                    last_seen: String::new(),
                },
                LoginEntry {
                    ip: "203.0.113.50".into(),
                    count: 2,
                    last_seen: String::new(),
                },
            ],
        };
        ctx.db
            .sitrep_cache()
            .put_json(sitrep_keys::SSH_SUMMARY, &summary, ctx.now())
            .await
            .unwrap();

        let targets = attacker_targets(&ctx).await;
        assert_eq!(
            targets,
            vec!["45.33.32.156", "104.248.168.210", "91.189.42.11"]
        );
    }

    #[tokio::test]
    async fn test_resolve_hostname_prefers_fresh_cache() {
        let (ctx, _dir) = test_ctx().await;
        ctx.db
            .dns_cache()
            .put("198.51.100.7", "cached.example.org", ctx.now())
            .await
            .unwrap();

        // A fresh cache row short-circuits before any command runs.
        let hostname = resolve_hostname(&ctx, "198.51.100.7").await;
        assert_eq!(hostname, "cached.example.org");
    }

    #[tokio::test]
    async fn test_security_collector_records_when_ss_present() {
        let (ctx, dir) = test_ctx().await;
        if which::which("ss").is_err() {
            // Environment without iproute2; the degraded path is covered
            // elsewhere.
            return;
        }

        std::fs::write(dir.path().join("auth.log"), "").unwrap();
        let outcome = SecurityCollector.run(&ctx).await;
        assert_eq!(outcome, CollectorOutcome::Ok);

        let (snapshot, ports) = ctx.db.trends().latest_security().await.unwrap().unwrap();
        assert_eq!(snapshot.ports_open as usize, ports.len());
    }

    #[test]
    fn test_split_syslog_prefix() {
        let (time, message) =
            split_syslog_prefix("Aug  2 09:15:33 host sshd[99]: Accepted publickey");
        assert_eq!(time, "Aug 2 09:15:33");
        assert_eq!(message, "host sshd[99]: Accepted publickey");
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("Aug 2 09:15:33", 5), "15:33");
        assert_eq!(tail_chars("9:15", 5), "9:15");
        assert_eq!(tail_chars("", 5), "");
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home("~/agents/main");
        assert!(!expanded.starts_with("~/") || dirs::home_dir().is_none());
        assert_eq!(expand_home("/abs/path"), "/abs/path");
    }
}
