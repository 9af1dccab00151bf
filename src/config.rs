use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::MonitorError;

static CONFIG: OnceLock<Config> = OnceLock::new();

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub zookeeper: ZooKeeperConfig,
    pub kafka: KafkaConfig,
    pub monitor: MonitorConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Loads the process configuration on first call.
    /// A malformed variable is reported once and the defaults are never silently substituted.
    pub fn global() -> Result<&'static Config, MonitorError> {
        if let Some(config) = CONFIG.get() {
            return Ok(config);
        }
        let loaded = Self::load()?;
        Ok(CONFIG.get_or_init(|| loaded))
    }

    pub fn load() -> Result<Self, MonitorError> {
        dotenv::dotenv().ok();
        Ok(Self {
            server: ServerConfig::load()?,
            zookeeper: ZooKeeperConfig::load()?,
            kafka: KafkaConfig::load()?,
            monitor: MonitorConfig::load()?,
            cache: CacheConfig::load()?,
        })
    }
}

// --- MODULES ---

// SERVER
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServerConfig {
    fn load() -> Result<Self, MonitorError> {
        Ok(Self {
            host:      get_env("SERVER_HOST", "0.0.0.0")?,
            port:      get_env("SERVER_PORT", "3000")?,
            log_level: get_env("LAGMON_LOG", "info")?,
        })
    }
}

// ZOOKEEPER
#[derive(Debug, Clone)]
pub struct ZooKeeperConfig {
    pub connect: String,
    pub consumers_path: String,
}

impl ZooKeeperConfig {
    fn load() -> Result<Self, MonitorError> {
        Ok(Self {
            connect:        get_env("ZOOKEEPER_CONNECT", "localhost:2181")?,
            consumers_path: get_env("ZOOKEEPER_CONSUMERS_PATH", "/consumers")?,
        })
    }
}

// KAFKA
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub client_id: String,
}

impl KafkaConfig {
    fn load() -> Result<Self, MonitorError> {
        let brokers: String = get_env("KAFKA_BROKERS", "localhost:9092")?;
        Ok(Self {
            brokers:   split_list(&brokers),
            client_id: get_env("KAFKA_CLIENT_ID", "lag-monitor")?,
        })
    }
}

// MONITOR
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub refresh_interval_ms: u64,
    /// Substrings; a group whose name contains any of them is never walked.
    pub excluded_groups: Vec<String>,
}

impl MonitorConfig {
    fn load() -> Result<Self, MonitorError> {
        let excluded: String = get_env("EXCLUDED_GROUPS", "schema-registry")?;
        Ok(Self {
            refresh_interval_ms: get_env("REFRESH_INTERVAL_MS", "30000")?,
            excluded_groups:     split_list(&excluded),
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 30_000,
            excluded_groups: vec!["schema-registry".to_string()],
        }
    }
}

// CACHE
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// 0 disables expiry.
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl CacheConfig {
    fn load() -> Result<Self, MonitorError> {
        Ok(Self {
            ttl_secs:              get_env("CACHE_TTL_SECS", "0")?,
            cleanup_interval_secs: get_env("CACHE_CLEANUP_INTERVAL_SECS", "60")?,
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 0, cleanup_interval_secs: 60 }
    }
}

// --- PRIVATE HELPERS ---

fn get_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, MonitorError> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| MonitorError::Config(format!("{} must be valid", key)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
