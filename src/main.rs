use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;

use consuldog::catalog::{ConsulClient, MonitorDeclaration};
use consuldog::cli::{Cli, Command};
use consuldog::config::Config;
use consuldog::lifecycle::{run_pipeline, signals, Shutdown};
use consuldog::materialize::template::dummy_service;
use consuldog::materialize::{CheckTemplate, LocatorSource, TemplateSource};
use consuldog::observability::{logging, metrics};
use consuldog::reload::SystemProcessTable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("consuldog v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command.clone().unwrap_or(Command::Watch) {
        Command::Watch => watch(config).await,
        Command::Validate {
            monitor_type,
            locators,
        } => validate(&config, &monitor_type, &locators).await,
    }
}

async fn watch(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        consul = %config.consul.address,
        prefix = %config.monitor.tag_prefix,
        output_dir = %config.datadog.output_dir.display(),
        process = %config.datadog.process_name,
        min_reload_interval_secs = config.datadog.min_reload_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            metrics::init_metrics(addr);
        }
    }

    let catalog = Arc::new(ConsulClient::new(&config.consul)?);
    let source = Arc::new(LocatorSource::new(&config.templates)?);

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let registry = run_pipeline(catalog, source, SystemProcessTable::new(), &config, shutdown).await?;

    tracing::info!(services = registry.len(), "Shutdown complete");
    Ok(())
}

async fn validate(
    config: &Config,
    monitor_type: &str,
    locators: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let source = LocatorSource::new(&config.templates)?;
    let mut failures = 0;

    for locator in locators {
        let monitor = MonitorDeclaration {
            template: locator.clone(),
            monitor_type: monitor_type.to_string(),
        };

        let checked = match source.fetch(locator).await {
            Ok(raw) => CheckTemplate::compile(&monitor, &raw)
                .and_then(|t| t.render(&dummy_service(&monitor), &monitor)),
            Err(e) => Err(e),
        };

        match checked.map(|c| c.to_yaml()) {
            Ok(Ok(yaml)) => println!("# {locator}: ok\n{yaml}"),
            Ok(Err(e)) => {
                failures += 1;
                eprintln!("# {locator}: cannot serialize: {e}");
            }
            Err(e) => {
                failures += 1;
                eprintln!("# {locator}: {e}");
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {} template(s) failed validation", locators.len()).into());
    }
    Ok(())
}
