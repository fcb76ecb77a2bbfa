//! Dashboard configuration persisted to ~/.galactic_cic/config.json

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

fn default_theme() -> String {
    "phosphor".to_string()
}

fn default_refresh_interval() -> u64 {
    5
}

/// Dashboard settings: active theme and renderer refresh interval.
///
/// The refresh interval bounds how often the dashboard re-reads the store;
/// it is independent of the collector tier intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

impl DashboardConfig {
    /// Load config from a JSON file, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config as pretty-printed JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|_| Error::ConfigDir(parent.to_path_buf()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Effective refresh interval, clamped to the 1-second floor.
    pub fn effective_refresh(&self) -> u64 {
        self.refresh_interval.max(crate::constants::MIN_REFRESH_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.theme, "phosphor");
        assert_eq!(config.refresh_interval, 5);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = DashboardConfig::load(&dir.path().join("missing.json"));
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_load_garbage_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json {").unwrap();
        let config = DashboardConfig::load(&path);
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = DashboardConfig {
            theme: "amber".to_string(),
            refresh_interval: 2,
        };
        config.save(&path).unwrap();

        let loaded = DashboardConfig::load(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"theme": "blue"}"#).unwrap();

        let config = DashboardConfig::load(&path);
        assert_eq!(config.theme, "blue");
        assert_eq!(config.refresh_interval, 5);
    }

    #[test]
    fn test_effective_refresh_floor() {
        let config = DashboardConfig {
            theme: "phosphor".to_string(),
            refresh_interval: 0,
        };
        assert_eq!(config.effective_refresh(), 1);
    }
}
