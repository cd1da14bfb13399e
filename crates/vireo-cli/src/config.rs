use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Destination host for outbound messages
    pub host: String,
    /// Destination port for outbound messages
    pub port: u16,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8880,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Whether to receive control messages at all
    pub enabled: bool,
    /// UDP port control messages arrive on
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9990,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether to reload scripts when their files change
    pub enabled: bool,
    /// Watch only the active script instead of every loaded script
    pub replace_on_load: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            replace_on_load: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VireoConfig {
    /// Address prefix for control commands
    pub namespace: String,

    /// Scheduler tick interval in milliseconds
    pub tick_ms: u64,

    pub send: SendConfig,
    pub listen: ListenConfig,
    pub watch: WatchConfig,
}

impl Default for VireoConfig {
    fn default() -> Self {
        Self {
            namespace: "/vireo".to_string(),
            tick_ms: 50,
            send: SendConfig::default(),
            listen: ListenConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl VireoConfig {
    pub fn config_path() -> Option<PathBuf> {
        use directories::ProjectDirs;
        ProjectDirs::from("", "", "vireo").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it is absent.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VireoConfig::default();
        assert_eq!(config.namespace, "/vireo");
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.send.host, "localhost");
        assert_eq!(config.send.port, 8880);
        assert_eq!(config.listen.port, 9990);
        assert!(config.listen.enabled);
        assert!(config.watch.enabled);
        assert!(config.watch.replace_on_load);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: VireoConfig = toml::from_str("").unwrap();
        assert_eq!(config.namespace, "/vireo");
        assert_eq!(config.listen.port, 9990);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: VireoConfig = toml::from_str(
            r#"
            namespace = "/live"

            [send]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.namespace, "/live");
        assert_eq!(config.send.port, 9000);
        assert_eq!(config.send.host, "localhost");
        assert_eq!(config.tick_ms, 50);
    }
}
