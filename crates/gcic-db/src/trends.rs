//! Read-only query layer: trends, rates, sparklines, latest snapshots
//!
//! Every query here is a single SQL statement plus post-processing; the
//! store is the only source of truth and nothing is cached in memory.

use gcic_core::{AgentRecord, CronJob, CronStatus, Error, PortInfo, Rate, Result, Trend};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// 8-level block glyphs used for sparklines, lowest first
pub const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Relative change below which a trend reads as flat
const TREND_THRESHOLD: f64 = 0.05;

/// Map a numeric sequence onto block glyphs, normalized to observed
/// min/max. A flat sequence renders as the lowest glyph repeated. Output
/// length is `min(width, values.len())`, keeping the newest values.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }
    let tail = if values.len() > width {
        &values[values.len() - width..]
    } else {
        values
    };

    let min = tail.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = tail.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    tail.iter()
        .map(|v| {
            if span <= f64::EPSILON {
                SPARK_GLYPHS[0]
            } else {
                let level = ((v - min) / span * 7.0).round() as usize;
                SPARK_GLYPHS[level.min(7)]
            }
        })
        .collect()
}

/// Compare a current sample to a past one: ±5% relative change (absolute
/// 0.5 when the base is zero) reads as flat.
pub fn trend_between(current: Option<f64>, past: Option<f64>) -> Trend {
    let (current, past) = match (current, past) {
        (Some(c), Some(p)) => (c, p),
        _ => return Trend::Unknown,
    };
    let diff = current - past;
    if past > 0.0 {
        if (diff.abs() / past) < TREND_THRESHOLD {
            return Trend::Flat;
        }
    } else if diff.abs() < 0.5 {
        return Trend::Flat;
    }
    if diff > 0.0 {
        Trend::Up
    } else if diff < 0.0 {
        Trend::Down
    } else {
        Trend::Flat
    }
}

/// One CPU/MEM%/DISK% point from server_metrics
#[derive(Debug, Clone)]
pub struct ServerPoint {
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub disk_percent: f64,
}

/// 24h means; `None` when the window holds no data
#[derive(Debug, Clone, Default)]
pub struct ServerAverages {
    pub cpu: Option<f64>,
    pub mem: Option<f64>,
    pub disk: Option<f64>,
}

/// Trend arrows for the three server series
#[derive(Debug, Clone, Copy)]
pub struct ServerTrends {
    pub cpu: Trend,
    pub mem: Trend,
    pub disk: Trend,
}

impl Default for ServerTrends {
    fn default() -> Self {
        Self {
            cpu: Trend::Unknown,
            mem: Trend::Unknown,
            disk: Trend::Unknown,
        }
    }
}

/// Latest full server row
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    pub timestamp: f64,
    pub cpu_percent: f64,
    pub mem_used_mb: f64,
    pub mem_total_mb: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
    pub load: [f64; 3],
}

impl ServerSnapshot {
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

/// Latest agent row plus its tick timestamp
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pub timestamp: f64,
    pub record: AgentRecord,
}

/// Latest cron row plus its tick timestamp
#[derive(Debug, Clone)]
pub struct CronSnapshot {
    pub timestamp: f64,
    pub job: CronJob,
}

/// Latest security summary row
#[derive(Debug, Clone)]
pub struct SecuritySnapshot {
    pub timestamp: f64,
    pub ssh_intrusions_24h: u64,
    pub ports_open: u64,
    pub ufw_active: bool,
    pub fail2ban_active: bool,
    pub root_login_enabled: bool,
}

/// Latest network row
#[derive(Debug, Clone)]
pub struct NetworkSnapshot {
    pub timestamp: f64,
    pub active_connections: u64,
    pub unique_ips: u64,
}

/// Per-agent token rates plus the fleet total
#[derive(Debug, Clone, Default)]
pub struct FleetRates {
    pub per_agent: Vec<(String, Rate)>,
    pub total: i64,
}

/// Stateless read API over the metrics store
pub struct TrendQueries {
    pool: SqlitePool,
}

impl TrendQueries {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Newest-first CPU/MEM%/DISK% sequence from the trailing window
    pub async fn recent_server_metrics(
        &self,
        now: f64,
        hours: f64,
        limit: u32,
    ) -> Result<Vec<ServerPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, cpu_percent, mem_used_mb, mem_total_mb,
                   disk_used_gb, disk_total_gb
            FROM server_metrics
            WHERE timestamp >= ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(now - hours * 3600.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| {
                let mem_total: f64 = r.get("mem_total_mb");
                let disk_total: f64 = r.get("disk_total_gb");
                ServerPoint {
                    timestamp: r.get("timestamp"),
                    cpu_percent: r.get("cpu_percent"),
                    mem_percent: if mem_total > 0.0 {
                        r.get::<f64, _>("mem_used_mb") / mem_total * 100.0
                    } else {
                        0.0
                    },
                    disk_percent: if disk_total > 0.0 {
                        r.get::<f64, _>("disk_used_gb") / disk_total * 100.0
                    } else {
                        0.0
                    },
                }
            })
            .collect())
    }

    /// Mean CPU/MEM%/DISK% over the trailing window; `None` when empty
    pub async fn server_averages(&self, now: f64, hours: f64) -> Result<ServerAverages> {
        let row = sqlx::query(
            r#"
            SELECT AVG(cpu_percent) AS cpu,
                   AVG(CASE WHEN mem_total_mb > 0
                       THEN mem_used_mb * 100.0 / mem_total_mb END) AS mem,
                   AVG(CASE WHEN disk_total_gb > 0
                       THEN disk_used_gb * 100.0 / disk_total_gb END) AS disk
            FROM server_metrics
            WHERE timestamp >= ?
            "#,
        )
        .bind(now - hours * 3600.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        Ok(ServerAverages {
            cpu: row.get("cpu"),
            mem: row.get("mem"),
            disk: row.get("disk"),
        })
    }

    /// Trend arrows comparing the latest sample to the one nearest `now - lag`
    pub async fn server_trends(&self, now: f64, lag_secs: f64) -> Result<ServerTrends> {
        let current = sqlx::query(
            "SELECT cpu_percent, mem_used_mb, disk_used_gb FROM server_metrics ORDER BY timestamp DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        let past = sqlx::query(
            r#"
            SELECT cpu_percent, mem_used_mb, disk_used_gb
            FROM server_metrics
            WHERE timestamp <= ?
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(now - lag_secs)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        let (current, past) = match (current, past) {
            (Some(c), Some(p)) => (c, p),
            _ => return Ok(ServerTrends::default()),
        };

        Ok(ServerTrends {
            cpu: trend_between(
                Some(current.get("cpu_percent")),
                Some(past.get("cpu_percent")),
            ),
            mem: trend_between(
                Some(current.get("mem_used_mb")),
                Some(past.get("mem_used_mb")),
            ),
            disk: trend_between(
                Some(current.get("disk_used_gb")),
                Some(past.get("disk_used_gb")),
            ),
        })
    }

    /// Tokens/hour for one agent over the trailing window.
    ///
    /// Fewer than two in-window samples, or any decrease inside the window
    /// (a counter reset across a daemon restart), yields `Rate::Unknown`.
    pub async fn tokens_per_hour(&self, agent: &str, now: f64, window_secs: f64) -> Result<Rate> {
        let rows = sqlx::query(
            r#"
            SELECT tokens_used, timestamp
            FROM agent_metrics
            WHERE agent_name = ? AND timestamp >= ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(agent)
        .bind(now - window_secs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        if rows.len() < 2 {
            return Ok(Rate::Unknown);
        }

        let samples: Vec<(f64, i64)> = rows
            .iter()
            .map(|r| (r.get::<f64, _>("timestamp"), r.get::<i64, _>("tokens_used")))
            .collect();

        if samples.windows(2).any(|w| w[1].1 < w[0].1) {
            return Ok(Rate::Unknown);
        }

        let (t0, first) = samples[0];
        let (t1, last) = samples[samples.len() - 1];
        if t1 <= t0 {
            return Ok(Rate::Unknown);
        }
        let rate = (last - first) as f64 * 3600.0 / (t1 - t0);
        Ok(Rate::PerHour(rate as i64))
    }

    /// Per-agent rates plus the fleet total (sum of numeric rates only)
    pub async fn fleet_tokens_per_hour(&self, now: f64, window_secs: f64) -> Result<FleetRates> {
        let rows = sqlx::query(
            "SELECT DISTINCT agent_name FROM agent_metrics WHERE timestamp >= ? ORDER BY agent_name",
        )
        .bind(now - window_secs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        let mut rates = FleetRates::default();
        for row in rows {
            let name: String = row.get("agent_name");
            let rate = self.tokens_per_hour(&name, now, window_secs).await?;
            if let Some(n) = rate.numeric() {
                rates.total += n;
            }
            rates.per_agent.push((name, rate));
        }
        Ok(rates)
    }

    /// Sparkline over recent active-connection counts, oldest to newest
    pub async fn network_sparkline(&self, now: f64, width: usize) -> Result<String> {
        let rows = sqlx::query(
            r#"
            SELECT active_connections
            FROM network_metrics
            WHERE timestamp >= ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(now - 24.0 * 3600.0)
        .bind(width as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        let mut values: Vec<f64> = rows
            .iter()
            .map(|r| r.get::<i64, _>("active_connections") as f64)
            .collect();
        values.reverse();
        Ok(sparkline(&values, width))
    }

    /// Mean active connections over the trailing window; `None` when empty
    pub async fn network_average(&self, now: f64, hours: f64) -> Result<Option<f64>> {
        let row = sqlx::query(
            "SELECT AVG(active_connections) AS avg FROM network_metrics WHERE timestamp >= ?",
        )
        .bind(now - hours * 3600.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
        Ok(row.get("avg"))
    }

    /// Latest full server row, if any
    pub async fn latest_server(&self) -> Result<Option<ServerSnapshot>> {
        let row =
            sqlx::query("SELECT * FROM server_metrics ORDER BY timestamp DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
        Ok(row.map(|r| ServerSnapshot {
            timestamp: r.get("timestamp"),
            cpu_percent: r.get("cpu_percent"),
            mem_used_mb: r.get("mem_used_mb"),
            mem_total_mb: r.get("mem_total_mb"),
            disk_used_gb: r.get("disk_used_gb"),
            disk_total_gb: r.get("disk_total_gb"),
            load: [r.get("load_1m"), r.get("load_5m"), r.get("load_15m")],
        }))
    }

    /// All agent rows from the most recent tick
    pub async fn latest_agents(&self) -> Result<Vec<AgentSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM agent_metrics
            WHERE timestamp = (SELECT MAX(timestamp) FROM agent_metrics)
            ORDER BY agent_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| AgentSnapshot {
                timestamp: r.get("timestamp"),
                record: AgentRecord {
                    name: r.get("agent_name"),
                    model: r.get("model"),
                    workspace: String::new(),
                    sessions: r.get::<i64, _>("sessions") as u32,
                    tokens_used: r.get::<i64, _>("tokens_used") as u64,
                    storage_bytes: r.get::<i64, _>("storage_bytes") as u64,
                    is_default: r.get::<i64, _>("is_default") != 0,
                },
            })
            .collect())
    }

    /// All cron rows from the most recent tick
    pub async fn latest_cron(&self) -> Result<Vec<CronSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM cron_metrics
            WHERE timestamp = (SELECT MAX(timestamp) FROM cron_metrics)
            ORDER BY job_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|r| CronSnapshot {
                timestamp: r.get("timestamp"),
                job: CronJob {
                    name: r.get("job_name"),
                    status: CronStatus::normalize(&r.get::<String, _>("status")),
                    last_run: r.get("last_run"),
                    next_run: r.get("next_run"),
                    agent: String::new(),
                    consecutive_errors: r.get::<i64, _>("consecutive_errors") as u32,
                },
            })
            .collect())
    }

    /// Latest security summary plus the port rows sharing its timestamp
    pub async fn latest_security(&self) -> Result<Option<(SecuritySnapshot, Vec<PortInfo>)>> {
        let row =
            sqlx::query("SELECT * FROM security_metrics ORDER BY timestamp DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };
        let snapshot = SecuritySnapshot {
            timestamp: row.get("timestamp"),
            ssh_intrusions_24h: row.get::<i64, _>("ssh_intrusions_24h") as u64,
            ports_open: row.get::<i64, _>("ports_open") as u64,
            ufw_active: row.get::<i64, _>("ufw_active") != 0,
            fail2ban_active: row.get::<i64, _>("fail2ban_active") != 0,
            root_login_enabled: row.get::<i64, _>("root_login_enabled") != 0,
        };

        let port_rows =
            sqlx::query("SELECT port, service, state FROM port_scans WHERE timestamp = ? ORDER BY port")
                .bind(snapshot.timestamp)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;

        let ports = port_rows
            .iter()
            .map(|r| PortInfo {
                port: r.get::<i64, _>("port") as u16,
                service: r.get("service"),
                state: r.get("state"),
            })
            .collect();

        Ok(Some((snapshot, ports)))
    }

    /// Latest network row, if any
    pub async fn latest_network(&self) -> Result<Option<NetworkSnapshot>> {
        let row =
            sqlx::query("SELECT * FROM network_metrics ORDER BY timestamp DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
        Ok(row.map(|r| NetworkSnapshot {
            timestamp: r.get("timestamp"),
            active_connections: r.get::<i64, _>("active_connections") as u64,
            unique_ips: r.get::<i64, _>("unique_ips") as u64,
        }))
    }
}
