//! Config materialization subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceRegistry (by_type buckets)
//!     → source.rs (resolve each distinct locator once per pass)
//!     → template.rs (compile + dummy-service validation)
//!     → template.rs (render per service)
//!     → check.rs (merge: instances concatenate, init_config key-union)
//!     → writer.rs (<output_dir>/<type>.yaml, atomic replace)
//! ```
//!
//! # Design Decisions
//! - A bad template or service never aborts the pass, only its own output
//! - Templates are re-fetched every pass; a fixed template is picked up on
//!   the next update without a restart
//! - Documents are fully serialized in memory before touching disk

pub mod check;
pub mod materializer;
pub mod source;
pub mod template;
pub mod writer;

pub use check::CheckConfig;
pub use materializer::{MaterializeReport, Materializer};
pub use source::{LocatorSource, TemplateSource};
pub use template::{CheckTemplate, TemplateError};
