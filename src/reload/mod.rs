//! Reload subsystem.
//!
//! # Data Flow
//! ```text
//! registry task: files changed
//!     → trigger (try_send on a 1-slot channel)
//!     → coordinator.rs (PendingReload until the next tick)
//!     → process.rs (enumerate by name/owner, SIGHUP each match)
//! ```
//!
//! # Design Decisions
//! - Tick-based debounce: bursts of catalog churn collapse into at most one
//!   reload per interval
//! - Processes are rediscovered on every attempt

pub mod coordinator;
pub mod process;

pub use coordinator::{ReloadCoordinator, ReloadOutcome, ReloadState};
pub use process::{ProcessInfo, ProcessTable, ReloadError, SystemProcessTable};
