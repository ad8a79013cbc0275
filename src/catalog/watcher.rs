//! Per-node catalog watch loop.
//!
//! # Responsibilities
//! - Long-poll the catalog for one node
//! - Emit a full [`NodeSnapshot`] every time the node's index moves
//! - Back off on failures without ever giving up
//!
//! # Design Decisions
//! - Snapshots are sent even when empty: that is how removals propagate
//! - Snapshots carry the configured node name, not the catalog's spelling of
//!   it, so a node's additions and removals always land under one key
//! - Shutdown is checked first on every iteration and also races the
//!   in-flight query, the backoff sleep and the channel send

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;

use crate::catalog::client::Catalog;
use crate::catalog::tags::extract_service;
use crate::catalog::types::{NodeServices, NodeSnapshot};
use crate::observability::metrics;

/// Watches a single node and feeds the registry task.
pub struct NodeWatcher<C: ?Sized> {
    catalog: Arc<C>,
    node: String,
    prefix: String,
    backoff: Duration,
    last_index: u64,
}

impl<C: Catalog + ?Sized> NodeWatcher<C> {
    pub fn new(catalog: Arc<C>, node: impl Into<String>, prefix: impl Into<String>, backoff: Duration) -> Self {
        Self {
            catalog,
            node: node.into(),
            prefix: prefix.into(),
            backoff,
            last_index: 0,
        }
    }

    /// Run until shutdown fires or the receiving side goes away.
    pub async fn run(mut self, output: mpsc::Sender<NodeSnapshot>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(node = %self.node, prefix = %self.prefix, "Catalog watcher starting");

        loop {
            let result = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                result = self.catalog.node_services(&self.node, self.last_index) => result,
            };

            let services = match result {
                Ok(services) => services,
                Err(e) => {
                    tracing::warn!(
                        node = %self.node,
                        error = %e,
                        backoff_secs = self.backoff.as_secs(),
                        "Catalog query failed, retrying after backoff"
                    );
                    metrics::record_catalog_error(&self.node);
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => break,
                        _ = sleep(self.backoff) => continue,
                    }
                }
            };

            let Some(snapshot) = self.observe(services) else {
                continue;
            };

            tracing::debug!(
                node = %snapshot.node,
                index = self.last_index,
                services = snapshot.services.len(),
                "Node changed, sending snapshot"
            );

            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                sent = output.send(snapshot) => {
                    if sent.is_err() {
                        tracing::debug!(node = %self.node, "Snapshot receiver closed");
                        break;
                    }
                }
            }
        }

        tracing::info!(node = %self.node, "Catalog watcher stopped");
    }

    /// Turn a query result into a snapshot if the index moved.
    fn observe(&mut self, response: NodeServices) -> Option<NodeSnapshot> {
        if response.index == self.last_index {
            return None;
        }
        self.last_index = response.index;

        if response.node != self.node {
            tracing::debug!(
                node = %self.node,
                reported = %response.node,
                "Catalog reports the node under another name"
            );
        }

        let services = response
            .services
            .into_iter()
            .filter_map(|entry| extract_service(&self.prefix, &self.node, entry))
            .collect();

        Some(NodeSnapshot {
            node: self.node.clone(),
            services,
        })
    }
}
