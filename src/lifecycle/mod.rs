//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve nodes → reload coordinator → registry task → watchers
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → every task exits at its next
//!     suspension point → join
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run_pipeline, StartupError};
