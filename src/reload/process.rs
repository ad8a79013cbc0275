//! Process discovery and signalling.
//!
//! The target process may restart at any time, so it is looked up by name on
//! every reload attempt; PIDs are never cached across attempts.

use sysinfo::{Pid, ProcessRefreshKind, Signal, System};
use thiserror::Error;

/// A running process as seen at the last refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Effective UID, when the platform exposes it.
    pub effective_uid: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("process {0} is gone")]
    NoSuchProcess(u32),

    #[error("signals are not supported on this platform")]
    Unsupported,

    #[error("failed to deliver SIGHUP to process {0}")]
    SignalFailed(u32),
}

/// Process enumeration plus "send reload signal by PID".
pub trait ProcessTable: Send {
    /// Re-read the process list.
    fn refresh(&mut self);

    /// Processes seen at the last refresh.
    fn processes(&self) -> Vec<ProcessInfo>;

    /// Effective UID of this process, if obtainable.
    fn current_effective_uid(&self) -> Option<u32>;

    /// Send SIGHUP.
    fn send_reload(&self, pid: u32) -> Result<(), ReloadError>;
}

/// [`ProcessTable`] backed by `sysinfo`.
pub struct SystemProcessTable {
    system: System,
    own_pid: Option<Pid>,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        let own_pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot determine own PID, reload matching ignores owner");
                None
            }
        };
        Self {
            system: System::new(),
            own_pid,
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn refresh(&mut self) {
        self.system
            .refresh_processes_specifics(ProcessRefreshKind::everything());
    }

    fn processes(&self) -> Vec<ProcessInfo> {
        self.system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                effective_uid: process.effective_user_id().map(|uid| **uid),
            })
            .collect()
    }

    fn current_effective_uid(&self) -> Option<u32> {
        let pid = self.own_pid?;
        self.system
            .process(pid)
            .and_then(|p| p.effective_user_id())
            .map(|uid| **uid)
    }

    fn send_reload(&self, pid: u32) -> Result<(), ReloadError> {
        let process = self
            .system
            .process(Pid::from_u32(pid))
            .ok_or(ReloadError::NoSuchProcess(pid))?;

        match process.kill_with(Signal::Hangup) {
            Some(true) => Ok(()),
            Some(false) => Err(ReloadError::SignalFailed(pid)),
            None => Err(ReloadError::Unsupported),
        }
    }
}

/// Processes a reload should go to: same name, and same effective UID when
/// both sides know theirs.
pub fn matching_processes(
    processes: Vec<ProcessInfo>,
    name: &str,
    own_uid: Option<u32>,
) -> Vec<ProcessInfo> {
    processes
        .into_iter()
        .filter(|p| p.name == name)
        .filter(|p| match (own_uid, p.effective_uid) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => true,
        })
        .collect()
}
