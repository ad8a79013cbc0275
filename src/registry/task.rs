//! The task that owns the registry.
//!
//! Snapshots from every watcher funnel into this one task, which applies
//! them, runs a materialization pass and nudges the reload coordinator when
//! an output file changed. Nothing else ever touches the registry.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};

use crate::catalog::types::NodeSnapshot;
use crate::materialize::{MaterializeReport, Materializer, TemplateSource};
use crate::observability::metrics;
use crate::registry::store::ServiceRegistry;

pub struct RegistryTask<S: ?Sized> {
    registry: ServiceRegistry,
    materializer: Materializer<S>,
    reload: mpsc::Sender<()>,
}

impl<S: TemplateSource + ?Sized> RegistryTask<S> {
    pub fn new(materializer: Materializer<S>, reload: mpsc::Sender<()>) -> Self {
        Self {
            registry: ServiceRegistry::new(),
            materializer,
            reload,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Apply one snapshot and materialize.
    pub async fn handle(&mut self, snapshot: NodeSnapshot) -> MaterializeReport {
        let node = snapshot.node.clone();
        let count = snapshot.services.len();

        self.registry.apply(snapshot);
        metrics::record_snapshot(&node);
        metrics::record_registry_size(self.registry.len());
        tracing::info!(
            node = %node,
            services = count,
            total_services = self.registry.len(),
            "Applied node snapshot"
        );

        let report = self.materializer.materialize(&self.registry).await;
        if report.changed() {
            self.trigger_reload();
        }
        report
    }

    fn trigger_reload(&self) {
        match self.reload.try_send(()) {
            // Full means a trigger is already queued.
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => {
                tracing::debug!("Reload coordinator gone, dropping trigger");
            }
        }
    }

    /// Consume snapshots until shutdown or until every watcher is gone.
    /// Returns the final registry.
    ///
    /// Shutdown also cuts short a pass that is still fetching templates.
    /// Each output file is replaced atomically, so an abandoned pass leaves
    /// every file either old or new.
    pub async fn run(
        mut self,
        mut snapshots: mpsc::Receiver<NodeSnapshot>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ServiceRegistry {
        tracing::info!(output_dir = %self.materializer.output_dir().display(), "Registry task starting");

        loop {
            let snapshot = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                snapshot = snapshots.recv() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = self.handle(snapshot) => {}
            }
        }

        tracing::info!(services = self.registry.len(), "Registry task stopped");
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{MonitorDeclaration, Service};
    use crate::materialize::TemplateError;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fixed;

    #[async_trait]
    impl TemplateSource for Fixed {
        async fn fetch(&self, _locator: &str) -> Result<String, TemplateError> {
            Ok("instances:\n  - host: {{ address }}\n".to_string())
        }
    }

    fn snapshot(node: &str, ids: &[&str]) -> NodeSnapshot {
        NodeSnapshot {
            node: node.into(),
            services: ids
                .iter()
                .map(|id| Service {
                    id: id.to_string(),
                    name: "web".into(),
                    node: node.into(),
                    address: "10.0.0.1".into(),
                    port: 80,
                    tags: vec![],
                    monitors: vec![MonitorDeclaration {
                        template: "t".into(),
                        monitor_type: "tcp_check".into(),
                    }],
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_triggers_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let (reload_tx, mut reload_rx) = mpsc::channel(1);
        let mut task = RegistryTask::new(Materializer::new(Arc::new(Fixed), dir.path()), reload_tx);

        task.handle(snapshot("n1", &["s1"])).await;
        assert!(reload_rx.try_recv().is_ok());

        task.handle(snapshot("n1", &["s1"])).await;
        assert!(reload_rx.try_recv().is_err());

        task.handle(snapshot("n2", &["s2"])).await;
        task.handle(snapshot("n2", &["s2", "s3"])).await;
        // Two changes, one queued trigger.
        assert!(reload_rx.try_recv().is_ok());
        assert!(reload_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_when_watchers_are_gone() {
        let dir = tempfile::tempdir().unwrap();
        let (reload_tx, _reload_rx) = mpsc::channel(1);
        let task = RegistryTask::new(Materializer::new(Arc::new(Fixed), dir.path()), reload_tx);
        let (snap_tx, snap_rx) = mpsc::channel(5);
        let (_stop_tx, stop_rx) = broadcast::channel(1);

        snap_tx.send(snapshot("n1", &["s1", "s2"])).await.unwrap();
        snap_tx.send(snapshot("n2", &["s3"])).await.unwrap();
        drop(snap_tx);

        let registry = task.run(snap_rx, stop_rx).await;
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.monitors_of_type("tcp_check").len(), 3);
    }

    /// Never resolves, like a template server that stopped answering.
    struct Stalled;

    #[async_trait]
    impl TemplateSource for Stalled {
        async fn fetch(&self, _locator: &str) -> Result<String, TemplateError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_stalled_pass() {
        let dir = tempfile::tempdir().unwrap();
        let (reload_tx, _reload_rx) = mpsc::channel(1);
        let task = RegistryTask::new(Materializer::new(Arc::new(Stalled), dir.path()), reload_tx);
        let (snap_tx, snap_rx) = mpsc::channel(5);
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let handle = tokio::spawn(task.run(snap_rx, stop_rx));

        snap_tx.send(snapshot("n1", &["s1"])).await.unwrap();
        // Let the task pick up the snapshot and block in the fetch.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        stop_tx.send(()).unwrap();

        let registry = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("registry task did not stop")
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
