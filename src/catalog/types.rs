//! Catalog data types and error definitions.

use serde::Serialize;
use thiserror::Error;

/// A monitor a service asks for: which template to render, and which
/// Datadog check type (output file) the result belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MonitorDeclaration {
    /// Template locator (path relative to the template root, or URL).
    pub template: String,
    /// Monitor type, e.g. `http_check`.
    pub monitor_type: String,
}

/// One catalog service on one node, together with its monitor declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub node: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub monitors: Vec<MonitorDeclaration>,
}

/// Full set of monitored services of one node at one catalog index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub node: String,
    pub services: Vec<Service>,
}

/// A service as reported by the catalog, before tag parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogService {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
}

/// Result of a blocking node query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeServices {
    /// Catalog index the response reflects.
    pub index: u64,
    /// Node name as reported by the catalog (falls back to the queried name).
    pub node: String,
    pub services: Vec<CatalogService>,
}

/// Errors that can occur while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog answered with a non-success status.
    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response lacked the blocking-query index header.
    #[error("catalog response is missing a valid X-Consul-Index header")]
    MissingIndex,

    /// Response body did not have the expected shape.
    #[error("unexpected catalog response: {0}")]
    Decode(String),

    /// Configured address could not be turned into a request URL.
    #[error("invalid catalog address '{0}'")]
    Address(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
