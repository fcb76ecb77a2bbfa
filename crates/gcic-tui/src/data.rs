//! Panel data objects, filled exclusively from the query layer
//!
//! The renderer computes nothing: everything it draws arrives here as an
//! already-shaped value read from the store.

use gcic_core::constants::sitrep_keys;
use gcic_core::{
    ActionItem, ActivityEvent, ChannelStatus, PlatformStatus, PortInfo, ProcessInfo, Result,
    SshLoginSummary, TopIp, UpdateStatus,
};
use gcic_db::trends::{
    AgentSnapshot, CronSnapshot, FleetRates, NetworkSnapshot, SecuritySnapshot, ServerAverages,
    ServerSnapshot, ServerTrends,
};
use gcic_db::{sparkline, CacheLookup, Database};

/// A cached payload plus its staleness, for "(Xm old)" annotations
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub stale_age: Option<f64>,
}

fn cached<T>(lookup: CacheLookup<T>) -> Option<Cached<T>> {
    match lookup {
        CacheLookup::Fresh(value) => Some(Cached {
            value,
            stale_age: None,
        }),
        CacheLookup::Stale(value, age) => Some(Cached {
            value,
            stale_age: Some(age),
        }),
        CacheLookup::Miss => None,
    }
}

/// One attacker row for the Security panel
#[derive(Debug, Clone)]
pub struct AttackerRow {
    pub ip: String,
    pub count: u64,
    pub country_code: String,
    pub hostname: String,
    pub open_ports: Vec<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct AgentPanelData {
    pub agents: Vec<AgentSnapshot>,
    pub rates: FleetRates,
    pub platform: Option<Cached<PlatformStatus>>,
}

impl AgentPanelData {
    pub fn total_sessions(&self) -> u32 {
        self.agents.iter().map(|a| a.record.sessions).sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.agents.iter().map(|a| a.record.tokens_used).sum()
    }

    pub fn rate_for(&self, name: &str) -> gcic_core::Rate {
        self.rates
            .per_agent
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, r)| *r)
            .unwrap_or(gcic_core::Rate::Unknown)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerPanelData {
    pub latest: Option<ServerSnapshot>,
    pub averages: ServerAverages,
    pub trends: ServerTrends,
    pub cpu_sparkline: String,
    pub network: Option<NetworkSnapshot>,
    pub network_sparkline: String,
    pub network_average: Option<f64>,
    pub top_processes: Option<Cached<Vec<ProcessInfo>>>,
}

#[derive(Debug, Clone, Default)]
pub struct CronPanelData {
    pub jobs: Vec<CronSnapshot>,
}

#[derive(Debug, Clone, Default)]
pub struct SecurityPanelData {
    pub snapshot: Option<(SecuritySnapshot, Vec<PortInfo>)>,
    pub ssh: Option<Cached<SshLoginSummary>>,
    pub attackers: Vec<AttackerRow>,
    pub nmap_active: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityPanelData {
    pub errors: Vec<ActivityEvent>,
    pub recent: Vec<ActivityEvent>,
    pub top_ips: Vec<TopIp>,
}

#[derive(Debug, Clone, Default)]
pub struct SitrepPanelData {
    pub channels: Option<Cached<Vec<ChannelStatus>>>,
    pub update: Option<Cached<UpdateStatus>>,
    pub action_items: Option<Cached<Vec<ActionItem>>>,
}

/// Everything the six panels draw, read in one pass
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub now: f64,
    pub agents: AgentPanelData,
    pub server: ServerPanelData,
    pub cron: CronPanelData,
    pub security: SecurityPanelData,
    pub activity: ActivityPanelData,
    pub sitrep: SitrepPanelData,
}

/// Read all panel data from the store. Any store error surfaces to the
/// caller, which renders it as a banner instead of crashing.
pub async fn load(db: &Database, now: f64) -> Result<DashboardData> {
    let trends = db.trends();
    let sitrep = db.sitrep_cache();

    let agents = AgentPanelData {
        agents: trends.latest_agents().await?,
        rates: trends.fleet_tokens_per_hour(now, 3600.0).await?,
        platform: cached(sitrep.get_json(sitrep_keys::PLATFORM_STATUS, now).await?),
    };

    let recent = trends.recent_server_metrics(now, 1.0, 20).await?;
    let mut cpu_series: Vec<f64> = recent.iter().map(|p| p.cpu_percent).collect();
    cpu_series.reverse();
    let server = ServerPanelData {
        latest: trends.latest_server().await?,
        averages: trends.server_averages(now, 24.0).await?,
        trends: trends.server_trends(now, 3600.0).await?,
        cpu_sparkline: sparkline(&cpu_series, 20),
        network: trends.latest_network().await?,
        network_sparkline: trends.network_sparkline(now, 20).await?,
        network_average: trends.network_average(now, 24.0).await?,
        top_processes: cached(sitrep.get_json(sitrep_keys::TOP_PROCESSES, now).await?),
    };

    let cron = CronPanelData {
        jobs: trends.latest_cron().await?,
    };

    let ssh: Option<Cached<SshLoginSummary>> =
        cached(sitrep.get_json(sitrep_keys::SSH_SUMMARY, now).await?);
    let mut attackers = Vec::new();
    if let Some(summary) = ssh.as_ref() {
        let geo = db.geo_cache();
        let dns = db.dns_cache();
        let scans = db.scan_cache();
        for entry in summary.value.failed.iter().take(3) {
            let country_code = geo
                .get(&entry.ip, now)
                .await?
                .into_value()
                .map(|g| g.country_code)
                .unwrap_or_else(|| "?".to_string());
            let hostname = dns
                .get(&entry.ip, now)
                .await?
                .into_value()
                .unwrap_or_default();
            let open_ports = scans
                .get(&entry.ip, now)
                .await?
                .into_value()
                .map(|s| s.open_ports)
                .unwrap_or_default();
            attackers.push(AttackerRow {
                ip: entry.ip.clone(),
                count: entry.count,
                country_code,
                hostname,
                open_ports,
            });
        }
    }
    let security = SecurityPanelData {
        snapshot: trends.latest_security().await?,
        ssh,
        attackers,
        nmap_active: db.nmap_active().await?,
    };

    let activity = ActivityPanelData {
        errors: cached(sitrep.get_json(sitrep_keys::ACTIVITY_ERRORS, now).await?)
            .map(|c| c.value)
            .unwrap_or_default(),
        recent: cached(sitrep.get_json(sitrep_keys::ACTIVITY_RECENT, now).await?)
            .map(|c| c.value)
            .unwrap_or_default(),
        top_ips: cached(sitrep.get_json(sitrep_keys::TOP_IPS, now).await?)
            .map(|c| c.value)
            .unwrap_or_default(),
    };

    let sitrep_data = SitrepPanelData {
        channels: cached(sitrep.get_json(sitrep_keys::CHANNELS, now).await?),
        update: cached(sitrep.get_json(sitrep_keys::UPDATE_CHECK, now).await?),
        action_items: cached(sitrep.get_json(sitrep_keys::ACTION_ITEMS, now).await?),
    };

    Ok(DashboardData {
        now,
        agents,
        server,
        cron,
        security,
        activity,
        sitrep: sitrep_data,
    })
}
