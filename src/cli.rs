//! Command-line interface.
//!
//! Flags override values from the config file; the file overrides built-in
//! defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_config, validate_config, Config, ConfigError};

#[derive(Debug, Parser)]
#[command(name = "consuldog")]
#[command(about = "Generate Datadog check configs from Consul service tags", long_about = None)]
pub struct Cli {
    /// Config file (TOML).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Address of the Consul agent.
    #[arg(short = 'a', long, global = true)]
    pub consul_address: Option<String>,

    /// Tag prefix marking a service as needing monitoring.
    #[arg(short, long, global = true)]
    pub prefix: Option<String>,

    /// Folder relative template locators are resolved against.
    #[arg(short, long, global = true)]
    pub template_folder: Option<PathBuf>,

    /// Base Datadog folder; check configs go to its `conf.d`.
    #[arg(short, long, global = true)]
    pub datadog_folder: Option<PathBuf>,

    /// Name of the process to send SIGHUP to after config changes.
    #[arg(short = 'k', long, global = true)]
    pub process_name: Option<String>,

    /// Minimum seconds between reloads, however often configs change.
    #[arg(short, long, global = true)]
    pub min_reload_interval: Option<u64>,

    /// Node to watch (repeatable). Defaults to the agent's own node.
    #[arg(short, long = "node", global = true)]
    pub nodes: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Watch Consul and keep check configs up to date (default).
    Watch,
    /// Validate templates against the dummy service and print the result.
    Validate {
        /// Monitor type to expose to the templates.
        #[arg(long, default_value = "custom_check")]
        monitor_type: String,

        /// Template locators (paths or URLs).
        #[arg(required = true)]
        locators: Vec<String>,
    },
}

impl Cli {
    /// Build the effective configuration: file (or defaults) plus flags,
    /// validated as a whole.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        self.apply_overrides(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(address) = &self.consul_address {
            config.consul.address = address.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.monitor.tag_prefix = prefix.clone();
        }
        if let Some(folder) = &self.datadog_folder {
            let conf_d = folder.join("conf.d");
            // The template root follows the Datadog folder unless given.
            if self.template_folder.is_none() {
                config.templates.root = conf_d.join("auto_conf");
            }
            config.datadog.output_dir = conf_d;
        }
        if let Some(folder) = &self.template_folder {
            config.templates.root = folder.clone();
        }
        if let Some(name) = &self.process_name {
            config.datadog.process_name = name.clone();
        }
        if let Some(secs) = self.min_reload_interval {
            config.datadog.min_reload_interval_secs = secs;
        }
        if !self.nodes.is_empty() {
            config.monitor.nodes = self.nodes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "consuldog",
            "-a",
            "http://consul:8500",
            "-n",
            "web-1",
            "--node",
            "web-2",
            "-m",
            "30",
            "watch",
        ]);
        let config = cli.load().unwrap();

        assert_eq!(config.consul.address, "http://consul:8500");
        assert_eq!(config.monitor.nodes, vec!["web-1", "web-2"]);
        assert_eq!(config.datadog.min_reload_interval_secs, 30);
        assert!(matches!(cli.command, Some(Command::Watch)));
    }

    #[test]
    fn test_datadog_folder_moves_output_and_templates() {
        let cli = Cli::parse_from(["consuldog", "-d", "/opt/datadog-agent"]);
        let config = cli.load().unwrap();
        assert_eq!(config.datadog.output_dir, Path::new("/opt/datadog-agent/conf.d"));
        assert_eq!(config.templates.root, Path::new("/opt/datadog-agent/conf.d/auto_conf"));

        let cli = Cli::parse_from(["consuldog", "-d", "/opt/dd", "-t", "/srv/templates"]);
        let config = cli.load().unwrap();
        assert_eq!(config.templates.root, Path::new("/srv/templates"));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::parse_from(["consuldog", "-m", "0"]);
        assert!(matches!(cli.load(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_requires_locators() {
        assert!(Cli::try_parse_from(["consuldog", "validate"]).is_err());
        let cli = Cli::parse_from(["consuldog", "validate", "http.yaml", "tcp.yaml"]);
        match cli.command {
            Some(Command::Validate { monitor_type, locators }) => {
                assert_eq!(monitor_type, "custom_check");
                assert_eq!(locators, vec!["http.yaml", "tcp.yaml"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
