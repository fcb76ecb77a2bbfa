//! Keyed TTL caches backed by the store
//!
//! Each cache is an upserted table read through `CacheLookup`: readers
//! prefer fresh rows, surface stale rows with their age so the UI can keep
//! displaying a value while a refetch happens, and treat expired-or-absent
//! as a miss.

use gcic_core::constants::{sitrep_keys, DNS_TTL_SECS, GEO_TTL_SECS, SCAN_TTL_SECS};
use gcic_core::{Error, GeoInfo, Result, ScanResult};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Cache read result: fresh payload, stale payload plus age, or miss
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Fresh(T),
    Stale(T, f64),
    Miss,
}

impl<T> CacheLookup<T> {
    /// The payload, fresh or stale
    pub fn into_value(self) -> Option<T> {
        match self {
            CacheLookup::Fresh(v) | CacheLookup::Stale(v, _) => Some(v),
            CacheLookup::Miss => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheLookup::Fresh(_))
    }
}

fn classify<T>(value: T, resolved_at: f64, now: f64, ttl: f64) -> CacheLookup<T> {
    let age = now - resolved_at;
    if age <= ttl {
        CacheLookup::Fresh(value)
    } else {
        CacheLookup::Stale(value, age)
    }
}

/// Reverse-DNS cache, 24h TTL
pub struct DnsCache {
    pool: SqlitePool,
}

impl DnsCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, ip: &str, now: f64) -> Result<CacheLookup<String>> {
        let row = sqlx::query("SELECT hostname, resolved_at FROM dns_cache WHERE ip = ?")
            .bind(ip)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        Ok(match row {
            Some(r) => classify(
                r.get::<String, _>("hostname"),
                r.get::<f64, _>("resolved_at"),
                now,
                DNS_TTL_SECS,
            ),
            None => CacheLookup::Miss,
        })
    }

    pub async fn put(&self, ip: &str, hostname: &str, now: f64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO dns_cache (ip, hostname, resolved_at) VALUES (?, ?, ?)")
            .bind(ip)
            .bind(hostname)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }
}

/// IP geolocation cache, 7d TTL
pub struct GeoCache {
    pool: SqlitePool,
}

impl GeoCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, ip: &str, now: f64) -> Result<CacheLookup<GeoInfo>> {
        let row =
            sqlx::query("SELECT country_code, city, isp, resolved_at FROM geo_cache WHERE ip = ?")
                .bind(ip)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
        Ok(match row {
            Some(r) => {
                let info = GeoInfo {
                    country_code: r.get("country_code"),
                    city: r.get("city"),
                    isp: r.get("isp"),
                };
                classify(info, r.get::<f64, _>("resolved_at"), now, GEO_TTL_SECS)
            }
            None => CacheLookup::Miss,
        })
    }

    pub async fn put(&self, ip: &str, info: &GeoInfo, now: f64) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO geo_cache (ip, country_code, city, isp, resolved_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(ip)
        .bind(&info.country_code)
        .bind(&info.city)
        .bind(&info.isp)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }
}

/// Attacker nmap cache, 6h TTL
pub struct ScanCache {
    pool: SqlitePool,
}

impl ScanCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, ip: &str, now: f64) -> Result<CacheLookup<ScanResult>> {
        let row =
            sqlx::query("SELECT open_ports, os_guess, scanned_at FROM attacker_scans WHERE ip = ?")
                .bind(ip)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
        Ok(match row {
            Some(r) => {
                let result = ScanResult::from_cached(
                    &r.get::<String, _>("open_ports"),
                    &r.get::<String, _>("os_guess"),
                );
                classify(result, r.get::<f64, _>("scanned_at"), now, SCAN_TTL_SECS)
            }
            None => CacheLookup::Miss,
        })
    }

    pub async fn put(&self, ip: &str, result: &ScanResult, now: f64) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO attacker_scans (ip, open_ports, os_guess, scanned_at) VALUES (?, ?, ?, ?)",
        )
        .bind(ip)
        .bind(result.ports_csv())
        .bind(&result.os_guess)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }
}

/// JSON snapshot cache with per-key TTLs (SITREP, activity, process list)
pub struct SitrepCache {
    pool: SqlitePool,
}

impl SitrepCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str, now: f64) -> Result<CacheLookup<String>> {
        let row = sqlx::query("SELECT payload, cached_at FROM sitrep_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        Ok(match row {
            Some(r) => classify(
                r.get::<String, _>("payload"),
                r.get::<f64, _>("cached_at"),
                now,
                sitrep_keys::ttl(key),
            ),
            None => CacheLookup::Miss,
        })
    }

    pub async fn put(&self, key: &str, payload: &str, now: f64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO sitrep_cache (key, payload, cached_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(payload)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        Ok(())
    }

    /// Typed convenience over the JSON payload
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        now: f64,
    ) -> Result<CacheLookup<T>> {
        Ok(match self.get(key, now).await? {
            CacheLookup::Fresh(payload) => match serde_json::from_str(&payload) {
                Ok(v) => CacheLookup::Fresh(v),
                Err(_) => CacheLookup::Miss,
            },
            CacheLookup::Stale(payload, age) => match serde_json::from_str(&payload) {
                Ok(v) => CacheLookup::Stale(v, age),
                Err(_) => CacheLookup::Miss,
            },
            CacheLookup::Miss => CacheLookup::Miss,
        })
    }

    pub async fn put_json<T: serde::Serialize>(&self, key: &str, value: &T, now: f64) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.put(key, &payload, now).await
    }
}

/// Remove cache rows whose TTL has expired. Used by the pruner.
pub async fn evict_expired(pool: &SqlitePool, now: f64) -> Result<u64> {
    let mut removed = 0u64;
    let expirations: &[(&str, &str, f64)] = &[
        ("dns_cache", "resolved_at", DNS_TTL_SECS),
        ("geo_cache", "resolved_at", GEO_TTL_SECS),
        ("attacker_scans", "scanned_at", SCAN_TTL_SECS),
    ];
    for &(table, column, ttl) in expirations {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE {} < ?", table, column))
            .bind(now - ttl)
            .execute(pool)
            .await
            .map_err(|e| Error::Db(e.to_string()))?;
        removed += result.rows_affected();
    }

    // sitrep TTLs vary per key; evict row by row
    let rows = sqlx::query("SELECT key, cached_at FROM sitrep_cache")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
    for row in rows {
        let key: String = row.get("key");
        let cached_at: f64 = row.get("cached_at");
        if now - cached_at > sitrep_keys::ttl(&key) {
            let result = sqlx::query("DELETE FROM sitrep_cache WHERE key = ?")
                .bind(&key)
                .execute(pool)
                .await
                .map_err(|e| Error::Db(e.to_string()))?;
            removed += result.rows_affected();
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use tempfile::tempdir;

    async fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("metrics.db")).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn test_dns_fresh_stale_miss() {
        let (db, _dir) = test_db().await;
        let cache = db.dns_cache();

        assert_eq!(cache.get("1.2.3.4", 1000.0).await.unwrap(), CacheLookup::Miss);

        cache.put("1.2.3.4", "host.example.com", 1000.0).await.unwrap();
        assert_eq!(
            cache.get("1.2.3.4", 1000.0 + 60.0).await.unwrap(),
            CacheLookup::Fresh("host.example.com".to_string())
        );

        let later = 1000.0 + DNS_TTL_SECS + 5.0;
        match cache.get("1.2.3.4", later).await.unwrap() {
            CacheLookup::Stale(host, age) => {
                assert_eq!(host, "host.example.com");
                assert!(age > DNS_TTL_SECS);
            }
            other => panic!("expected stale, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_geo_roundtrip() {
        let (db, _dir) = test_db().await;
        let cache = db.geo_cache();

        let info = GeoInfo {
            country_code: "DE".to_string(),
            city: "Berlin".to_string(),
            isp: "Example AG".to_string(),
        };
        cache.put("5.6.7.8", &info, 500.0).await.unwrap();

        assert_eq!(
            cache.get("5.6.7.8", 600.0).await.unwrap(),
            CacheLookup::Fresh(info)
        );
    }

    #[tokio::test]
    async fn test_scan_cache_ttl() {
        let (db, _dir) = test_db().await;
        let cache = db.scan_cache();

        let result = ScanResult {
            open_ports: vec![22, 8080],
            os_guess: "Linux".to_string(),
        };
        cache.put("9.9.9.9", &result, 0.0).await.unwrap();

        assert!(cache.get("9.9.9.9", SCAN_TTL_SECS - 1.0).await.unwrap().is_fresh());
        assert!(!cache.get("9.9.9.9", SCAN_TTL_SECS + 1.0).await.unwrap().is_fresh());
    }

    #[tokio::test]
    async fn test_sitrep_json_roundtrip() {
        let (db, _dir) = test_db().await;
        let cache = db.sitrep_cache();

        let channels = vec![gcic_core::ChannelStatus {
            name: "telegram".to_string(),
            enabled: "yes".to_string(),
            state: "OK".to_string(),
            detail: String::new(),
        }];
        cache
            .put_json(sitrep_keys::CHANNELS, &channels, 100.0)
            .await
            .unwrap();

        let lookup: CacheLookup<Vec<gcic_core::ChannelStatus>> = cache
            .get_json(sitrep_keys::CHANNELS, 150.0)
            .await
            .unwrap();
        assert_eq!(lookup.into_value().unwrap(), channels);
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let (db, _dir) = test_db().await;
        db.dns_cache().put("1.1.1.1", "old", 0.0).await.unwrap();
        db.dns_cache()
            .put("2.2.2.2", "young", DNS_TTL_SECS)
            .await
            .unwrap();

        let removed = evict_expired(db.pool(), DNS_TTL_SECS + 10.0).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            db.dns_cache().get("1.1.1.1", DNS_TTL_SECS + 10.0).await.unwrap(),
            CacheLookup::Miss
        );
    }
}
