//! Catalog subsystem.
//!
//! # Data Flow
//! ```text
//! client.rs (blocking GET /v1/catalog/node/<node>?index=N)
//!     → watcher.rs (index comparison, backoff)
//!     → tags.rs (prefix match, "<template> <type>" split)
//!     → NodeSnapshot on the snapshot channel
//! ```
//!
//! # Design Decisions
//! - One watcher task per node; watchers share nothing but the client
//! - Every change produces the node's full service set, never a diff
//! - Catalog errors are never fatal once running

pub mod client;
pub mod tags;
pub mod types;
pub mod watcher;

pub use client::{Catalog, ConsulClient};
pub use types::{CatalogError, CatalogService, MonitorDeclaration, NodeServices, NodeSnapshot, Service};
pub use watcher::NodeWatcher;
