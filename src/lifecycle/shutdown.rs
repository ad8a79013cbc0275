//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to every pipeline task.
///
/// Watchers, the registry task and the reload coordinator each hold their
/// own receiver. The flag remembers a trigger so that receivers created
/// after it can still be told, see [`Shutdown::redeliver`].
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every task to stop. Repeated calls are no-ops.
    pub fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(listeners = self.tx.receiver_count(), "Stopping pipeline tasks");
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Send the signal again if it already fired.
    ///
    /// Call after the last `subscribe`: a trigger that raced with the
    /// subscriptions then reaches every receiver. A receiver that sees two
    /// messages stops on the first.
    pub fn redeliver(&self) -> bool {
        if !self.is_triggered() {
            return false;
        }
        let _ = self.tx.send(());
        true
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
