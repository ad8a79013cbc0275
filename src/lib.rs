//! consuldog: Datadog check configs from Consul service tags.
//!
//! # Architecture Overview
//!
//! ```text
//!   Consul catalog
//!        │  blocking GET /v1/catalog/node/<node>?index=N
//!        ▼
//!  ┌───────────┐  NodeSnapshot  ┌──────────────┐  pass   ┌──────────────┐
//!  │ catalog   │───────────────▶│  registry    │────────▶│ materialize  │──▶ conf.d/<type>.yaml
//!  │ watcher×N │   (bounded)    │  task        │         │              │
//!  └───────────┘                └──────┬───────┘         └──────────────┘
//!                                      │ trigger (files changed)
//!                                      ▼
//!                               ┌──────────────┐  SIGHUP
//!                               │ reload       │────────▶ datadog agent process
//!                               │ coordinator  │
//!                               └──────────────┘
//!
//!  Cross-cutting: config · lifecycle (shutdown, signals, startup) · observability
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod materialize;
pub mod observability;
pub mod registry;
pub mod reload;

pub use config::Config;
pub use lifecycle::Shutdown;
