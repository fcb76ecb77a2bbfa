//! Database schema and versioned migrations

use gcic_core::{Error, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Current schema version
pub const SCHEMA_VERSION: i64 = 2;

/// Full DDL for a fresh database at the current version
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS server_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    cpu_percent REAL NOT NULL DEFAULT 0,
    mem_used_mb REAL NOT NULL DEFAULT 0,
    mem_total_mb REAL NOT NULL DEFAULT 0,
    disk_used_gb REAL NOT NULL DEFAULT 0,
    disk_total_gb REAL NOT NULL DEFAULT 0,
    load_1m REAL NOT NULL DEFAULT 0,
    load_5m REAL NOT NULL DEFAULT 0,
    load_15m REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS agent_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    agent_name TEXT NOT NULL,
    model TEXT NOT NULL DEFAULT '',
    tokens_used INTEGER NOT NULL DEFAULT 0,
    sessions INTEGER NOT NULL DEFAULT 0,
    storage_bytes INTEGER NOT NULL DEFAULT 0,
    is_default INTEGER NOT NULL DEFAULT 0,
    UNIQUE (agent_name, timestamp)
);

CREATE TABLE IF NOT EXISTS cron_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    job_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'idle',
    last_run TEXT NOT NULL DEFAULT '',
    next_run TEXT NOT NULL DEFAULT '',
    consecutive_errors INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS security_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    ssh_intrusions_24h INTEGER NOT NULL DEFAULT 0,
    ports_open INTEGER NOT NULL DEFAULT 0,
    ufw_active INTEGER NOT NULL DEFAULT 0,
    fail2ban_active INTEGER NOT NULL DEFAULT 0,
    root_login_enabled INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS port_scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    port INTEGER NOT NULL,
    service TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT 'open'
);

CREATE TABLE IF NOT EXISTS network_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    active_connections INTEGER NOT NULL DEFAULT 0,
    unique_ips INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS dns_cache (
    ip TEXT PRIMARY KEY,
    hostname TEXT NOT NULL DEFAULT '',
    resolved_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS geo_cache (
    ip TEXT PRIMARY KEY,
    country_code TEXT NOT NULL DEFAULT '?',
    city TEXT NOT NULL DEFAULT '',
    isp TEXT NOT NULL DEFAULT '',
    resolved_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS attacker_scans (
    ip TEXT PRIMARY KEY,
    open_ports TEXT NOT NULL DEFAULT '',
    os_guess TEXT NOT NULL DEFAULT '',
    scanned_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS sitrep_cache (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL DEFAULT '',
    cached_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_server_ts ON server_metrics(timestamp);
CREATE INDEX IF NOT EXISTS idx_agent_ts ON agent_metrics(timestamp);
CREATE INDEX IF NOT EXISTS idx_cron_ts ON cron_metrics(timestamp);
CREATE INDEX IF NOT EXISTS idx_security_ts ON security_metrics(timestamp);
CREATE INDEX IF NOT EXISTS idx_ports_ts ON port_scans(timestamp);
CREATE INDEX IF NOT EXISTS idx_network_ts ON network_metrics(timestamp);
"#;

/// Version-1 databases predate the `is_default` and `consecutive_errors`
/// columns; the v2 migration adds them in place.
const MIGRATE_V1_TO_V2: &[&str] = &[
    "ALTER TABLE agent_metrics ADD COLUMN is_default INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE cron_metrics ADD COLUMN consecutive_errors INTEGER NOT NULL DEFAULT 0",
];

/// Apply DDL and bring the schema up to the current version.
///
/// A fresh database gets the full schema and the current version stamp.
/// Older versions are migrated monotonically; newer versions are left alone
/// (the store never downgrades).
pub async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

    let version = current_version(pool).await?;
    match version {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
        }
        Some(v) if v < SCHEMA_VERSION => {
            migrate(pool, v).await?;
        }
        Some(_) => {}
    }
    Ok(())
}

/// Read the stored schema version, if any
pub async fn current_version(pool: &SqlitePool) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT version FROM schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
    Ok(row.map(|r| r.get::<i64, _>("version")))
}

async fn migrate(pool: &SqlitePool, from: i64) -> Result<()> {
    let mut version = from;
    while version < SCHEMA_VERSION {
        let statements = match version {
            1 => MIGRATE_V1_TO_V2,
            other => {
                return Err(Error::Db(format!(
                    "no migration path from schema version {}",
                    other
                )))
            }
        };
        for stmt in statements {
            // Re-running against a partially migrated table reports a
            // duplicate column, which is fine to ignore.
            if let Err(e) = sqlx::query(stmt).execute(pool).await {
                let msg = e.to_string();
                if !msg.contains("duplicate column") {
                    return Err(Error::Db(msg));
                }
            }
        }
        version += 1;
        tracing::info!("Migrated schema to version {}", version);
    }
    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_fresh_db() {
        let pool = memory_pool().await;
        bootstrap(&pool).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), Some(SCHEMA_VERSION));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let pool = memory_pool().await;
        bootstrap(&pool).await.unwrap();
        bootstrap(&pool).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), Some(SCHEMA_VERSION));
    }

    #[tokio::test]
    async fn test_migration_from_v1() {
        let pool = memory_pool().await;

        // Build a v1 database: old-shape tables without the new columns.
        sqlx::raw_sql(
            r#"
            CREATE TABLE schema_version (version INTEGER NOT NULL);
            CREATE TABLE agent_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                agent_name TEXT NOT NULL,
                model TEXT NOT NULL DEFAULT '',
                tokens_used INTEGER NOT NULL DEFAULT 0,
                sessions INTEGER NOT NULL DEFAULT 0,
                storage_bytes INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE cron_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                job_name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'idle',
                last_run TEXT NOT NULL DEFAULT '',
                next_run TEXT NOT NULL DEFAULT ''
            );
            INSERT INTO schema_version (version) VALUES (1);
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        bootstrap(&pool).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), Some(SCHEMA_VERSION));

        // New columns must be writable after migration.
        sqlx::query(
            "INSERT INTO agent_metrics (timestamp, agent_name, is_default) VALUES (1.0, 'main', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO cron_metrics (timestamp, job_name, consecutive_errors) VALUES (1.0, 'j', 3)",
        )
        .execute(&pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_never_downgrades() {
        let pool = memory_pool().await;
        bootstrap(&pool).await.unwrap();
        sqlx::query("UPDATE schema_version SET version = ?")
            .bind(SCHEMA_VERSION + 5)
            .execute(&pool)
            .await
            .unwrap();

        bootstrap(&pool).await.unwrap();
        assert_eq!(
            current_version(&pool).await.unwrap(),
            Some(SCHEMA_VERSION + 5)
        );
    }
}
