//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve which nodes to watch
//! - Spawn the reload coordinator, the registry task and one watcher per node
//! - Wait for all of them after shutdown
//!
//! # Design Decisions
//! - Consumers start before producers so no snapshot waits on a missing task
//! - Node-name resolution retries forever; only shutdown aborts it
//! - A shutdown that races task startup is redelivered once all tasks
//!   have subscribed

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinError;
use tokio::time::sleep;

use crate::catalog::{Catalog, CatalogError, NodeWatcher};
use crate::config::Config;
use crate::lifecycle::shutdown::Shutdown;
use crate::materialize::{Materializer, TemplateSource};
use crate::registry::{RegistryTask, ServiceRegistry};
use crate::reload::{ProcessTable, ReloadCoordinator};

/// Room for a few snapshots before a watcher blocks on send.
const SNAPSHOT_BUFFER: usize = 5;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),

    #[error("shutdown requested before startup completed")]
    Interrupted,

    #[error("task failed: {0}")]
    Task(#[from] JoinError),
}

/// Nodes from configuration, or the connected agent's own node.
pub async fn resolve_nodes<C: Catalog + ?Sized>(
    catalog: &C,
    configured: &[String],
    backoff: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<Vec<String>, StartupError> {
    if !configured.is_empty() {
        return Ok(configured.to_vec());
    }

    loop {
        let result = tokio::select! {
            biased;
            _ = shutdown.recv() => return Err(StartupError::Interrupted),
            result = catalog.agent_node_name() => result,
        };

        match result {
            Ok(name) => {
                tracing::info!(node = %name, "Watching the local agent's node");
                return Ok(vec![name]);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve agent node name, retrying");
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => return Err(StartupError::Interrupted),
                    _ = sleep(backoff) => {}
                }
            }
        }
    }
}

/// Run the whole watch pipeline until `shutdown` fires.
///
/// Returns the registry as it was when the registry task stopped.
pub async fn run_pipeline<C, S, P>(
    catalog: Arc<C>,
    source: Arc<S>,
    processes: P,
    config: &Config,
    shutdown: Shutdown,
) -> Result<ServiceRegistry, StartupError>
where
    C: Catalog + ?Sized + 'static,
    S: TemplateSource + ?Sized + 'static,
    P: ProcessTable + 'static,
{
    let backoff = Duration::from_secs(config.consul.retry_backoff_secs);
    let mut startup_shutdown = shutdown.subscribe();
    if shutdown.is_triggered() {
        return Err(StartupError::Interrupted);
    }
    let nodes = resolve_nodes(
        catalog.as_ref(),
        &config.monitor.nodes,
        backoff,
        &mut startup_shutdown,
    )
    .await?;

    let (snapshot_tx, snapshot_rx) = mpsc::channel(SNAPSHOT_BUFFER);
    let (reload_tx, reload_rx) = mpsc::channel(1);

    let coordinator = ReloadCoordinator::new(processes, &config.datadog);
    let reload_handle = tokio::spawn(coordinator.run(reload_rx, shutdown.subscribe()));

    let materializer = Materializer::new(source, config.datadog.output_dir.clone());
    let registry_task = RegistryTask::new(materializer, reload_tx);
    let registry_handle = tokio::spawn(registry_task.run(snapshot_rx, shutdown.subscribe()));

    let mut watcher_handles = Vec::with_capacity(nodes.len());
    for node in nodes {
        let watcher = NodeWatcher::new(catalog.clone(), node, config.monitor.tag_prefix.clone(), backoff);
        watcher_handles.push(tokio::spawn(watcher.run(snapshot_tx.clone(), shutdown.subscribe())));
    }
    // Registry task ends once every watcher has dropped its sender.
    drop(snapshot_tx);

    // Every receiver exists now; a trigger that fired during startup may
    // have missed some of them.
    if shutdown.redeliver() {
        tracing::info!("Shutdown requested during startup");
    }

    tracing::info!(watchers = watcher_handles.len(), "Pipeline running");

    for handle in watcher_handles {
        handle.await?;
    }
    let registry = registry_handle.await?;
    reload_handle.await?;

    Ok(registry)
}
