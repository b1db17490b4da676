//! batchd configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main batchd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batching and rate limiting
    pub scheduler: SchedulerConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// HTTP client used by the CLI
    pub client: ClientConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_batch_size == 0 {
            return Err(eyre::eyre!("scheduler.max-batch-size must be at least 1"));
        }
        self.server.bind_addr()?;
        Ok(())
    }

    /// Load configuration: an explicit path must load, otherwise the first
    /// readable of `./batchd.yml` and `<config dir>/batchd/batchd.yml` wins
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }
        Ok(Self::load_first(&Self::search_paths()))
    }

    fn search_paths() -> Vec<PathBuf> {
        let user = dirs::config_dir().map(|dir| dir.join("batchd").join("batchd.yml"));
        std::iter::once(PathBuf::from("batchd.yml")).chain(user).collect()
    }

    /// First candidate that exists and parses; broken files are skipped with a warning
    fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable config"),
            }
        }
        tracing::info!("No config file found, using defaults");
        Self::default()
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: String,

    /// Largest accepted item id (ids start at 1)
    #[serde(rename = "max-item-id")]
    pub max_item_id: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            max_item_id: 1_000_000_007,
        }
    }
}

impl ServerConfig {
    /// Parse the bind address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .context(format!("Invalid server.bind address: {}", self.bind))
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of a running batchd server
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.scheduler.max_batch_size, 3);
        assert_eq!(config.scheduler.cooldown_ms, 5_000);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.server.max_item_id, 1_000_000_007);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
scheduler:
  max-batch-size: 5
  cooldown-ms: 1000
  item-latency-ms: 10

server:
  bind: 0.0.0.0:8080
  max-item-id: 100

client:
  base-url: http://batchd.internal:8080
  timeout-ms: 2000
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.scheduler.max_batch_size, 5);
        assert_eq!(config.scheduler.cooldown_ms, 1000);
        assert_eq!(config.scheduler.item_latency_ms, 10);
        assert_eq!(config.server.bind_addr().unwrap().port(), 8080);
        assert_eq!(config.server.max_item_id, 100);
        assert_eq!(config.client.base_url, "http://batchd.internal:8080");
        assert_eq!(config.client.timeout_ms, 2000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
scheduler:
  cooldown-ms: 250
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.scheduler.cooldown_ms, 250);

        // Defaults for unspecified
        assert_eq!(config.scheduler.max_batch_size, 3);
        assert_eq!(config.scheduler.item_latency_ms, 500);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.scheduler.max_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_bind() {
        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheduler:\n  max-batch-size: 7").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.scheduler.max_batch_size, 7);
    }

    #[test]
    fn test_load_missing_explicit_path_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_first_skips_broken_candidate() {
        let dir = tempfile::TempDir::new().unwrap();
        let broken = dir.path().join("broken.yml");
        let good = dir.path().join("good.yml");
        std::fs::write(&broken, "scheduler: [not, a, map]").unwrap();
        std::fs::write(&good, "scheduler:\n  cooldown-ms: 42").unwrap();

        let config = Config::load_first(&[dir.path().join("absent.yml"), broken, good]);
        assert_eq!(config.scheduler.cooldown_ms, 42);
    }

    #[test]
    fn test_load_first_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_first(&[dir.path().join("absent.yml")]);
        assert_eq!(config.scheduler.max_batch_size, 3);
    }
}
