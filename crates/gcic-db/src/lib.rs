//! GalacticCIC metrics store - SQLite persistence layer
//!
//! The collector daemon is the only writer; dashboards attach as readers.
//! WAL journaling keeps concurrent reads consistent during writes.

pub mod cache;
pub mod recorder;
pub mod schema;
pub mod trends;

use gcic_core::constants::{self, RETENTION_SECS};
use gcic_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub use cache::{CacheLookup, DnsCache, GeoCache, ScanCache, SitrepCache};
pub use recorder::Recorder;
pub use trends::{sparkline, TrendQueries};

/// Per-table row count and newest timestamp, for `gcic db stats`
#[derive(Debug, Clone)]
pub struct TableStats {
    pub table: &'static str,
    pub label: &'static str,
    pub rows: i64,
    pub newest: Option<f64>,
}

/// Time-series tables subject to retention pruning
const TS_TABLES: &[&str] = &[
    "server_metrics",
    "agent_metrics",
    "cron_metrics",
    "security_metrics",
    "port_scans",
    "network_metrics",
];

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the metrics database with WAL journaling
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Db(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;

        schema::bootstrap(&pool).await?;
        info!("Database ready at {}", path.display());

        Ok(Self { pool })
    }

    /// Open an existing database read-side; fails if the file is absent
    pub async fn open_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Db(format!("database not found: {}", path.display())));
        }
        Self::open(path).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn recorder(&self) -> Recorder {
        Recorder::new(self.pool.clone())
    }

    pub fn trends(&self) -> TrendQueries {
        TrendQueries::new(self.pool.clone())
    }

    pub fn dns_cache(&self) -> DnsCache {
        DnsCache::new(self.pool.clone())
    }

    pub fn geo_cache(&self) -> GeoCache {
        GeoCache::new(self.pool.clone())
    }

    pub fn scan_cache(&self) -> ScanCache {
        ScanCache::new(self.pool.clone())
    }

    pub fn sitrep_cache(&self) -> SitrepCache {
        SitrepCache::new(self.pool.clone())
    }

    /// Delete time-series rows past retention and expired cache rows.
    /// Idempotent; returns the number of rows removed.
    pub async fn prune(&self, now: f64) -> Result<u64> {
        let cutoff = now - RETENTION_SECS;
        let mut removed = 0u64;

        for table in TS_TABLES {
            let result = sqlx::query(&format!("DELETE FROM {} WHERE timestamp < ?", table))
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
            removed += result.rows_affected();
        }

        removed += cache::evict_expired(&self.pool, now).await?;
        Ok(removed)
    }

    /// Row counts plus newest timestamp per table
    pub async fn stats(&self) -> Result<Vec<TableStats>> {
        const TABLES: &[(&'static str, &'static str)] = &[
            ("server_metrics", "Server"),
            ("agent_metrics", "Agents"),
            ("cron_metrics", "Cron"),
            ("security_metrics", "Security"),
            ("port_scans", "Port scans"),
            ("network_metrics", "Network"),
            ("dns_cache", "DNS cache"),
            ("geo_cache", "Geolocation"),
            ("attacker_scans", "Attacker scans"),
            ("sitrep_cache", "SITREP"),
        ];

        let mut stats = Vec::with_capacity(TABLES.len());
        for &(table, label) in TABLES {
            let count_row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
            let rows: i64 = count_row.get("n");

            let ts_column = match table {
                "dns_cache" | "geo_cache" => "resolved_at",
                "attacker_scans" => "scanned_at",
                "sitrep_cache" => "cached_at",
                _ => "timestamp",
            };
            let newest_row =
                sqlx::query(&format!("SELECT MAX({}) AS ts FROM {}", ts_column, table))
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| Error::Db(e.to_string()))?;
            let newest: Option<f64> = newest_row.get("ts");

            stats.push(TableStats {
                table,
                label,
                rows,
                newest,
            });
        }
        Ok(stats)
    }

    /// Read a control-plane value from the config table
    pub async fn get_control(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    /// Upsert a control-plane value into the config table
    pub async fn set_control(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO config (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }

    /// Nmap-active set count as seen by the dashboard process
    pub async fn nmap_active(&self) -> Result<u64> {
        Ok(self
            .get_control(constants::control_keys::NMAP_ACTIVE)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcic_core::ServerHealth;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("metrics.db");

        let db = Database::open(&db_path).await.unwrap();
        assert!(db_path.exists());
        db.close().await;
    }

    #[tokio::test]
    async fn test_open_existing_requires_file() {
        let dir = tempdir().unwrap();
        let result = Database::open_existing(&dir.path().join("missing.db")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_control_roundtrip() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();

        assert_eq!(db.get_control("daemon_state").await.unwrap(), None);
        db.set_control("daemon_state", "degraded").await.unwrap();
        assert_eq!(
            db.get_control("daemon_state").await.unwrap().as_deref(),
            Some("degraded")
        );
        db.set_control("daemon_state", "ok").await.unwrap();
        assert_eq!(
            db.get_control("daemon_state").await.unwrap().as_deref(),
            Some("ok")
        );
    }

    #[tokio::test]
    async fn test_prune_retention_boundary() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();
        let recorder = db.recorder();

        let now = 2_000_000_000.0;
        let old = now - RETENTION_SECS - 10.0;
        let young = now - RETENTION_SECS + 1.0;

        recorder
            .record_server(old, &ServerHealth::default())
            .await
            .unwrap();
        recorder
            .record_server(young, &ServerHealth::default())
            .await
            .unwrap();

        let removed = db.prune(now).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = db
            .trends()
            .recent_server_metrics(now, RETENTION_SECS / 3600.0 + 1.0, 100)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_prune_is_idempotent() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();
        let recorder = db.recorder();

        let now = 2_000_000_000.0;
        recorder
            .record_server(now - RETENTION_SECS - 5.0, &ServerHealth::default())
            .await
            .unwrap();

        let first = db.prune(now).await.unwrap();
        let second = db.prune(now).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_stats_counts_rows() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();

        db.recorder()
            .record_server(1000.0, &ServerHealth::default())
            .await
            .unwrap();

        let stats = db.stats().await.unwrap();
        let server = stats.iter().find(|s| s.table == "server_metrics").unwrap();
        assert_eq!(server.rows, 1);
        assert_eq!(server.newest, Some(1000.0));
    }
}
