//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → cloned sections handed to each component constructor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no global settings object
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    Config, ConsulConfig, DatadogConfig, MonitorConfig, ObservabilityConfig, TemplateConfig,
};
pub use validation::{validate_config, ValidationError};
