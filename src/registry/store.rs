//! Multi-indexed service store.
//!
//! Three indices are kept in lockstep:
//! - `by_id`: service ID → service
//! - `by_node`: node → services attributed to it
//! - `by_type`: monitor type → (service, declaration) entries
//!
//! A service is in `by_id`/`by_node` iff it is in exactly the `by_type`
//! buckets of its declarations. Buckets are unordered; removal swaps with
//! the last element. Emptied type buckets stay so the next materialization
//! pass can rewrite that type's file with no instances.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::types::{MonitorDeclaration, NodeSnapshot, Service};

/// One service needing one monitor.
#[derive(Debug, Clone)]
pub struct MonitorEntry {
    pub service: Arc<Service>,
    pub monitor: MonitorDeclaration,
}

/// Registry of monitored services. No internal locking: the registry task
/// owns it and is the only writer.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    by_id: HashMap<String, Arc<Service>>,
    by_node: HashMap<String, Vec<Arc<Service>>>,
    by_type: HashMap<String, Vec<MonitorEntry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a service into every index.
    ///
    /// A live service with the same ID is evicted first, wherever it lives.
    pub fn add(&mut self, service: Service) {
        if let Some(previous) = self.by_id.get(&service.id).cloned() {
            if previous.node != service.node {
                tracing::warn!(
                    service_id = %service.id,
                    previous_node = %previous.node,
                    node = %service.node,
                    "Service ID reported by two nodes, keeping the latest"
                );
            }
            self.evict(&previous);
        }

        let service = Arc::new(service);
        self.by_id.insert(service.id.clone(), service.clone());
        self.by_node
            .entry(service.node.clone())
            .or_default()
            .push(service.clone());

        for monitor in &service.monitors {
            self.by_type
                .entry(monitor.monitor_type.clone())
                .or_default()
                .push(MonitorEntry {
                    service: service.clone(),
                    monitor: monitor.clone(),
                });
        }
    }

    /// Drop every service attributed to `node`. Unknown nodes are a no-op.
    pub fn clear_node(&mut self, node: &str) {
        let Some(services) = self.by_node.remove(node) else {
            return;
        };

        for service in &services {
            self.remove_type_entries(service);
            self.by_id.remove(&service.id);
        }
    }

    /// Replace everything known about a node with the snapshot's content.
    pub fn apply(&mut self, snapshot: NodeSnapshot) {
        self.clear_node(&snapshot.node);
        for service in snapshot.services {
            self.add(service);
        }
    }

    /// Remove a single service from all three indices.
    fn evict(&mut self, service: &Arc<Service>) {
        self.remove_type_entries(service);
        self.by_id.remove(&service.id);

        if let Some(bucket) = self.by_node.get_mut(&service.node) {
            if let Some(pos) = bucket.iter().position(|s| Arc::ptr_eq(s, service)) {
                bucket.swap_remove(pos);
            }
            if bucket.is_empty() {
                self.by_node.remove(&service.node);
            }
        }
    }

    fn remove_type_entries(&mut self, service: &Arc<Service>) {
        for monitor in &service.monitors {
            let Some(bucket) = self.by_type.get_mut(&monitor.monitor_type) else {
                continue;
            };
            let found = bucket
                .iter()
                .position(|e| Arc::ptr_eq(&e.service, service) && e.monitor == *monitor);
            if let Some(pos) = found {
                bucket.swap_remove(pos);
            }
        }
    }

    /// Look up a live service by ID.
    pub fn get(&self, id: &str) -> Option<&Arc<Service>> {
        self.by_id.get(id)
    }

    /// Services currently attributed to `node`.
    pub fn node_services(&self, node: &str) -> &[Arc<Service>] {
        self.by_node.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries needing the given monitor type.
    pub fn monitors_of_type(&self, monitor_type: &str) -> &[MonitorEntry] {
        self.by_type
            .get(monitor_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every monitor type seen so far (including emptied ones), sorted.
    pub fn monitor_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Nodes with at least one live service.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.by_node.keys().map(String::as_str)
    }

    /// Number of live services.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
