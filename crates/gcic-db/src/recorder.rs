//! Record collector snapshots into the metrics tables
//!
//! Time-series rows are append-only; each `record_*` call covers one tick
//! and multi-row ticks share a single transaction and timestamp.

use gcic_core::{AgentRecord, CronJob, Error, NetworkActivity, Result, SecurityStatus, ServerHealth};
use sqlx::sqlite::SqlitePool;

/// Records collector data into the metrics database
pub struct Recorder {
    pool: SqlitePool,
}

impl Recorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one server-health tick
    pub async fn record_server(&self, ts: f64, health: &ServerHealth) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO server_metrics
                (timestamp, cpu_percent, mem_used_mb, mem_total_mb,
                 disk_used_gb, disk_total_gb, load_1m, load_5m, load_15m)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ts)
        .bind(health.cpu_percent)
        .bind(health.mem_used_mb)
        .bind(health.mem_total_mb)
        .bind(health.disk_used_gb)
        .bind(health.disk_total_gb)
        .bind(health.load[0])
        .bind(health.load[1])
        .bind(health.load[2])
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }

    /// Record one tick of agent rows in a single transaction.
    /// The unique (agent_name, timestamp) index makes duplicate ticks a no-op.
    pub async fn record_agents(&self, ts: f64, agents: &[AgentRecord]) -> Result<()> {
        if agents.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(|e| Error::Db(e.to_string()))?;
        for agent in agents {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO agent_metrics
                    (timestamp, agent_name, model, tokens_used, sessions, storage_bytes, is_default)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(ts)
            .bind(&agent.name)
            .bind(&agent.model)
            .bind(agent.tokens_used as i64)
            .bind(agent.sessions as i64)
            .bind(agent.storage_bytes as i64)
            .bind(agent.is_default as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }

    /// Record one tick of cron-job rows in a single transaction
    pub async fn record_cron(&self, ts: f64, jobs: &[CronJob]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(|e| Error::Db(e.to_string()))?;
        for job in jobs {
            sqlx::query(
                r#"
                INSERT INTO cron_metrics
                    (timestamp, job_name, status, last_run, next_run, consecutive_errors)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(ts)
            .bind(&job.name)
            .bind(job.status.as_str())
            .bind(&job.last_run)
            .bind(&job.next_run)
            .bind(job.consecutive_errors as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }

    /// Record one security tick: the summary row plus one port_scans row per
    /// open port, all under the same timestamp and transaction so that
    /// `ports_open` always equals the matching port_scans row count.
    pub async fn record_security(&self, ts: f64, status: &SecurityStatus) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| Error::Db(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO security_metrics
                (timestamp, ssh_intrusions_24h, ports_open, ufw_active,
                 fail2ban_active, root_login_enabled)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ts)
        .bind(status.ssh_intrusions_24h as i64)
        .bind(status.ports.len() as i64)
        .bind(status.ufw_active as i64)
        .bind(status.fail2ban_active as i64)
        .bind(status.root_login_enabled as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

        for port in &status.ports {
            sqlx::query(
                "INSERT INTO port_scans (timestamp, port, service, state) VALUES (?, ?, ?, ?)",
            )
            .bind(ts)
            .bind(port.port as i64)
            .bind(&port.service)
            .bind(&port.state)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        }
        tx.commit().await.map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }

    /// Record one network-activity tick
    pub async fn record_network(&self, ts: f64, activity: &NetworkActivity) -> Result<()> {
        sqlx::query(
            "INSERT INTO network_metrics (timestamp, active_connections, unique_ips) VALUES (?, ?, ?)",
        )
        .bind(ts)
        .bind(activity.active_connections as i64)
        .bind(activity.unique_ips as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use gcic_core::{CronStatus, PortInfo};
    use tempfile::tempdir;

    async fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn test_agent_tick_is_deduplicated() {
        let (db, _dir) = test_db().await;
        let recorder = db.recorder();

        let agents = vec![AgentRecord {
            name: "main".to_string(),
            model: "opus".to_string(),
            workspace: String::new(),
            sessions: 3,
            tokens_used: 126_000,
            storage_bytes: 0,
            is_default: true,
        }];

        recorder.record_agents(1000.0, &agents).await.unwrap();
        recorder.record_agents(1000.0, &agents).await.unwrap();

        let snapshot = db.trends().latest_agents().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].record.name, "main");
        assert!(snapshot[0].record.is_default);
    }

    #[tokio::test]
    async fn test_security_ports_match_summary() {
        let (db, _dir) = test_db().await;
        let recorder = db.recorder();

        let status = SecurityStatus {
            ssh_intrusions_24h: 67,
            ports: vec![
                PortInfo {
                    port: 22,
                    service: "ssh".to_string(),
                    state: "open".to_string(),
                },
                PortInfo {
                    port: 443,
                    service: "https".to_string(),
                    state: "open".to_string(),
                },
            ],
            ufw_active: true,
            fail2ban_active: false,
            root_login_enabled: false,
        };
        recorder.record_security(1000.0, &status).await.unwrap();

        let (snapshot, ports) = db.trends().latest_security().await.unwrap().unwrap();
        assert_eq!(snapshot.ports_open, 2);
        assert_eq!(ports.len(), 2);
        assert_eq!(snapshot.ssh_intrusions_24h, 67);
        assert!(snapshot.ufw_active);
        assert!(!snapshot.root_login_enabled);
    }

    #[tokio::test]
    async fn test_cron_roundtrip() {
        let (db, _dir) = test_db().await;

        let jobs = vec![CronJob {
            name: "backup".to_string(),
            status: CronStatus::Error,
            last_run: "09:00".to_string(),
            next_run: "10:00".to_string(),
            agent: "main".to_string(),
            consecutive_errors: 4,
        }];
        db.recorder().record_cron(2000.0, &jobs).await.unwrap();

        let latest = db.trends().latest_cron().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].job.status, CronStatus::Error);
        assert_eq!(latest[0].job.consecutive_errors, 4);
    }
}
