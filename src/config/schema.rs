//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for consuldog.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Consul connection settings.
    pub consul: ConsulConfig,

    /// Which nodes to watch and how to recognize monitor tags.
    pub monitor: MonitorConfig,

    /// Where templates come from.
    pub templates: TemplateConfig,

    /// Datadog output and reload settings.
    pub datadog: DatadogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Consul connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsulConfig {
    /// HTTP address of the Consul agent (e.g., "http://localhost:8500").
    pub address: String,

    /// Optional ACL token sent with every request.
    pub token: Option<String>,

    /// Maximum time a blocking query may wait for a change, in seconds.
    pub wait_secs: u64,

    /// Fixed delay before retrying a failed catalog query, in seconds.
    pub retry_backoff_secs: u64,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:8500".to_string(),
            token: None,
            wait_secs: 300,
            retry_backoff_secs: 5,
        }
    }
}

/// Tag recognition and node selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tag prefix marking a service as needing a monitor.
    pub tag_prefix: String,

    /// Nodes to watch. Empty means the node of the connected agent.
    pub nodes: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tag_prefix: "consuldogConfig:".to_string(),
            nodes: Vec::new(),
        }
    }
}

/// Template resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory relative template locators are resolved against.
    pub root: PathBuf,

    /// Directory for downloaded templates (removed right after reading).
    pub temp_dir: PathBuf,

    /// Upper bound on one remote template download, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/etc/dd-agent/conf.d/auto_conf"),
            temp_dir: std::env::temp_dir(),
            fetch_timeout_secs: 30,
        }
    }
}

/// Datadog agent integration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatadogConfig {
    /// Directory receiving one `<monitor type>.yaml` per monitor type.
    pub output_dir: PathBuf,

    /// Name of the process receiving SIGHUP after config changes.
    pub process_name: String,

    /// Minimum number of seconds between two reloads.
    pub min_reload_interval_secs: u64,
}

impl Default for DatadogConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/etc/dd-agent/conf.d"),
            process_name: "supervisord".to_string(),
            min_reload_interval_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9102".to_string(),
        }
    }
}
