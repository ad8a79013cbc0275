//! Debounced reload of the Datadog agent.
//!
//! # States
//! ```text
//! Idle           --trigger-->  PendingReload
//! PendingReload  --tick----->  (reload attempt) Idle
//! any            --shutdown->  stopped
//! ```
//!
//! A failed attempt is not retried early; the next trigger re-arms it.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::DatadogConfig;
use crate::observability::metrics;
use crate::reload::process::{matching_processes, ProcessTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    PendingReload,
}

/// Result of one reload attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub matched: usize,
    pub signalled: usize,
}

impl ReloadOutcome {
    pub fn success(&self) -> bool {
        self.signalled > 0
    }
}

pub struct ReloadCoordinator<P> {
    table: P,
    process_name: String,
    interval: Duration,
    state: ReloadState,
    last_reload: Option<Instant>,
}

impl<P: ProcessTable> ReloadCoordinator<P> {
    pub fn new(table: P, config: &DatadogConfig) -> Self {
        Self {
            table,
            process_name: config.process_name.clone(),
            interval: Duration::from_secs(config.min_reload_interval_secs),
            state: ReloadState::Idle,
            last_reload: None,
        }
    }

    pub fn state(&self) -> ReloadState {
        self.state
    }

    /// When the last attempt happened, successful or not.
    pub fn last_reload(&self) -> Option<Instant> {
        self.last_reload
    }

    pub fn on_trigger(&mut self) {
        if self.state == ReloadState::Idle {
            tracing::debug!("Reload requested");
        }
        self.state = ReloadState::PendingReload;
    }

    /// Periodic tick: reload if something is pending.
    pub fn on_tick(&mut self) -> Option<ReloadOutcome> {
        if self.state != ReloadState::PendingReload {
            return None;
        }
        let outcome = self.reload();
        self.state = ReloadState::Idle;
        self.last_reload = Some(Instant::now());
        Some(outcome)
    }

    /// Find the target processes and signal each of them.
    pub fn reload(&mut self) -> ReloadOutcome {
        self.table.refresh();
        let own_uid = self.table.current_effective_uid();
        let targets = matching_processes(self.table.processes(), &self.process_name, own_uid);

        let mut outcome = ReloadOutcome {
            matched: targets.len(),
            signalled: 0,
        };

        for target in targets {
            match self.table.send_reload(target.pid) {
                Ok(()) => {
                    tracing::info!(process = %target.name, pid = target.pid, "Reloaded");
                    outcome.signalled += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        process = %target.name,
                        pid = target.pid,
                        error = %e,
                        "Failed to send reload signal"
                    );
                }
            }
        }

        if !outcome.success() {
            let owner = own_uid.map_or_else(|| "<unknown>".to_string(), |uid| uid.to_string());
            tracing::warn!(
                process = %self.process_name,
                uid = %owner,
                matched = outcome.matched,
                "Could not find or signal any matching process, reload skipped"
            );
        }
        metrics::record_reload(outcome.success());
        outcome
    }

    /// Run until shutdown or until the trigger side goes away.
    pub async fn run(mut self, mut triggers: mpsc::Receiver<()>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            process = %self.process_name,
            interval_secs = self.interval.as_secs(),
            "Reload coordinator starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                trigger = triggers.recv() => match trigger {
                    Some(()) => self.on_trigger(),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.on_tick();
                }
            }
        }

        tracing::info!("Reload coordinator stopped");
    }
}
