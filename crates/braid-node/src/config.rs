//! Node configuration types

use braid_engine::creator::EventCreationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete node configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node operation settings
    #[serde(default)]
    pub node: NodeSettings,

    /// Event creation parameters
    #[serde(default)]
    pub creation: CreationSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: NodeConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Basic node settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Node name
    #[serde(default = "default_node_name")]
    pub name: String,

    /// Key seed file path
    #[serde(default = "default_keys_path")]
    pub keys_path: String,
}

fn default_node_name() -> String {
    "braid-node".to_string()
}

fn default_keys_path() -> String {
    "./keys/node".to_string()
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            name: default_node_name(),
            keys_path: default_keys_path(),
        }
    }
}

/// Event creation parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreationSettings {
    /// Strategy tunables passed through to the engine
    #[serde(default)]
    pub engine: EventCreationConfig,

    /// Milliseconds between creation attempts
    #[serde(default = "default_attempt_interval_ms")]
    pub attempt_interval_ms: u64,

    /// Maximum transactions per event (0 = unlimited)
    #[serde(default)]
    pub transaction_batch_limit: usize,

    /// Maximum events created per second (0 = unlimited)
    #[serde(default)]
    pub max_creation_rate: f64,

    /// Seconds after startup during which creation is denied
    #[serde(default = "default_startup_freeze_seconds")]
    pub startup_freeze_seconds: u64,

    /// Command-queue depth above which creation is denied (0 = disabled)
    #[serde(default = "default_intake_queue_limit")]
    pub intake_queue_limit: usize,

    /// Capacity of the worker's command queue
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

fn default_attempt_interval_ms() -> u64 {
    50
}

fn default_startup_freeze_seconds() -> u64 {
    10
}

fn default_intake_queue_limit() -> usize {
    1024
}

fn default_command_queue_capacity() -> usize {
    4096
}

impl CreationSettings {
    pub fn attempt_interval(&self) -> Duration {
        Duration::from_millis(self.attempt_interval_ms)
    }

    pub fn startup_freeze(&self) -> Duration {
        Duration::from_secs(self.startup_freeze_seconds)
    }
}

impl Default for CreationSettings {
    fn default() -> Self {
        Self {
            engine: EventCreationConfig::default(),
            attempt_interval_ms: default_attempt_interval_ms(),
            transaction_batch_limit: 0,
            max_creation_rate: 0.0,
            startup_freeze_seconds: default_startup_freeze_seconds(),
            intake_queue_limit: default_intake_queue_limit(),
            command_queue_capacity: default_command_queue_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Enable metrics
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus listen address
    #[serde(default = "default_prometheus_addr")]
    pub prometheus_addr: String,
}

fn default_true() -> bool {
    true
}

fn default_prometheus_addr() -> String {
    "127.0.0.1:9615".to_string()
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prometheus_addr: default_prometheus_addr(),
        }
    }
}
