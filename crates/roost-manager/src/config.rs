//! Manager configuration: TOML file with CLI overrides.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use roost_protocol::{EVICTION_TIMEOUT_SECS, ROUTER_POLL_INTERVAL_MS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Bind address of the handler-facing endpoint.
    pub listen_handlers: String,
    /// Bind address of the drone-facing endpoint.
    pub listen_drones: String,
    pub eviction_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            listen_handlers: "127.0.0.1:5000".to_string(),
            listen_drones: "127.0.0.1:5001".to_string(),
            eviction_timeout_secs: EVICTION_TIMEOUT_SECS,
            poll_interval_ms: ROUTER_POLL_INTERVAL_MS,
        }
    }
}

impl ManagerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.listen_handlers, "127.0.0.1:5000");
        assert_eq!(config.listen_drones, "127.0.0.1:5001");
        assert_eq!(config.eviction_timeout_secs, 10);
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.toml");
        std::fs::write(&path, "listen_drones = \"0.0.0.0:6001\"\n").unwrap();

        let config = ManagerConfig::load(&path).unwrap();
        assert_eq!(config.listen_drones, "0.0.0.0:6001");
        assert_eq!(config.listen_handlers, "127.0.0.1:5000");
        assert_eq!(config.eviction_timeout_secs, 10);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ManagerConfig::load(&dir.path().join("absent.toml")).is_err());
    }
}
