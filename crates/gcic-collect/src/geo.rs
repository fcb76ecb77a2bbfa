//! IP geolocation over free anonymous endpoints
//!
//! Primary is ip-api.com, fallback ipinfo.io. Both are keyless free tiers,
//! so requests are throttled to one per second process-wide.

use gcic_core::constants::HTTP_TIMEOUT;
use gcic_core::{Error, GeoInfo, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const RATE_LIMIT: Duration = Duration::from_secs(1);

/// HTTP client for geolocation lookups
pub struct GeoClient {
    client: reqwest::Client,
    last_request: Mutex<Option<Instant>>,
}

impl GeoClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent("GalacticCIC/3.1")
            .build()
            .unwrap_or_default();

        Self {
            client,
            last_request: Mutex::new(None),
        }
    }

    /// Look up geolocation for one IP, waiting out the rate limiter first.
    /// The fallback endpoint is tried when the primary fails.
    pub async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        self.throttle().await;

        match self.lookup_primary(ip).await {
            Ok(info) => Ok(info),
            Err(e) => {
                debug!("Primary geo endpoint failed for {}: {}", ip, e);
                self.throttle().await;
                self.lookup_fallback(ip).await
            }
        }
    }

    /// Enforce the global 1 req/s budget across both endpoints
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < RATE_LIMIT {
                tokio::time::sleep(RATE_LIMIT - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn lookup_primary(&self, ip: &str) -> Result<GeoInfo> {
        let url = format!(
            "http://ip-api.com/json/{}?fields=country,countryCode,city,isp",
            ip
        );
        let data: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(GeoInfo {
            country_code: json_str(&data, "countryCode").unwrap_or_else(|| "?".to_string()),
            city: json_str(&data, "city").unwrap_or_default(),
            isp: json_str(&data, "isp").unwrap_or_default(),
        })
    }

    async fn lookup_fallback(&self, ip: &str) -> Result<GeoInfo> {
        let url = format!("https://ipinfo.io/{}/json", ip);
        let data: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(GeoInfo {
            country_code: json_str(&data, "country").unwrap_or_else(|| "?".to_string()),
            city: json_str(&data, "city").unwrap_or_default(),
            isp: json_str(&data, "org").unwrap_or_default(),
        })
    }
}

impl Default for GeoClient {
    fn default() -> Self {
        Self::new()
    }
}

fn json_str(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(String::from)
}
