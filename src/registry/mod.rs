//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! NodeSnapshot (from any watcher)
//!     → task.rs (single owner, one snapshot at a time)
//!     → store.rs: clear_node(node) + add(service)…
//!     → materializer pass
//!     → reload trigger (only when a file changed)
//! ```
//!
//! # Design Decisions
//! - Message passing into one owning task instead of a lock
//! - Every update replaces the node wholesale; there is no diffing
//! - Bucket removal is swap-remove; buckets are consumed as sets

pub mod store;
pub mod task;

pub use store::{MonitorEntry, ServiceRegistry};
pub use task::RegistryTask;
