use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub events: EventLogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("bindery.db")
}

/// Document processing service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorConfig {
    /// Service URL (e.g., "http://localhost:8001")
    pub base_url: String,
    /// Request timeout in seconds (default: 120; rewrite calls are slow)
    #[serde(default = "default_processor_timeout")]
    pub timeout_secs: u32,
}

fn default_processor_timeout() -> u32 {
    120
}

/// Task dispatcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
    /// Number of concurrent task workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Capacity of the pending-task queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// A running task with no heartbeat for this long is considered
    /// interrupted by the startup recovery scan
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_stale_after_secs() -> u32 {
    300
}

/// Pipeline event log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventLogConfig {
    /// Channel capacity between emitters and the writer
    #[serde(default = "default_event_buffer")]
    pub buffer_size: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_event_buffer(),
        }
    }
}

fn default_event_buffer() -> usize {
    1024
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub processor: SanitizedProcessorConfig,
    pub dispatcher: DispatcherConfig,
}

/// Processor config as exposed over the API (URL not echoed back)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProcessorConfig {
    pub configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            processor: SanitizedProcessorConfig {
                configured: !config.processor.base_url.is_empty(),
                timeout_secs: config.processor.timeout_secs,
            },
            dispatcher: config.dispatcher.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[processor]
base_url = "http://localhost:8001"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.processor.base_url, "http://localhost:8001");
        assert_eq!(config.processor.timeout_secs, 120);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "bindery.db");
        assert_eq!(config.dispatcher.workers, 4);
        assert_eq!(config.dispatcher.queue_capacity, 256);
        assert_eq!(config.dispatcher.stale_after_secs, 300);
        assert_eq!(config.events.buffer_size, 1024);
    }

    #[test]
    fn test_deserialize_missing_processor_fails() {
        let toml = r#"
[server]
port = 9000
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[processor]
base_url = "http://proc:9000"
timeout_secs = 30

[server]
host = "127.0.0.1"
port = 3000

[database]
path = "/data/bindery.sqlite"

[dispatcher]
workers = 8
queue_capacity = 64
stale_after_secs = 120

[events]
buffer_size = 16
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.processor.timeout_secs, 30);
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.database.path.to_str().unwrap(),
            "/data/bindery.sqlite"
        );
        assert_eq!(config.dispatcher.workers, 8);
        assert_eq!(config.dispatcher.stale_after_secs, 120);
        assert_eq!(config.events.buffer_size, 16);
    }

    #[test]
    fn test_sanitized_config() {
        let config = Config {
            processor: ProcessorConfig {
                base_url: "http://localhost:8001".to_string(),
                timeout_secs: 60,
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            dispatcher: DispatcherConfig::default(),
            events: EventLogConfig::default(),
        };
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.processor.configured);
        assert_eq!(sanitized.processor.timeout_secs, 60);
        assert_eq!(sanitized.server.port, 8080);
    }
}
