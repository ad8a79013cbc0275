//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::Config;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("consul.address '{0}' is not an http(s) URL")]
    ConsulAddress(String),

    #[error("consul.wait_secs must be greater than zero")]
    ZeroWait,

    #[error("consul.retry_backoff_secs must be greater than zero")]
    ZeroBackoff,

    #[error("monitor.tag_prefix must not be empty")]
    EmptyPrefix,

    #[error("monitor.nodes contains an empty node name")]
    EmptyNodeName,

    #[error("templates.fetch_timeout_secs must be greater than zero")]
    ZeroFetchTimeout,

    #[error("datadog.process_name must not be empty")]
    EmptyProcessName,

    #[error("datadog.min_reload_interval_secs must be greater than zero")]
    ZeroReloadInterval,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.consul.address) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => errors.push(ValidationError::ConsulAddress(config.consul.address.clone())),
    }

    if config.consul.wait_secs == 0 {
        errors.push(ValidationError::ZeroWait);
    }

    if config.consul.retry_backoff_secs == 0 {
        errors.push(ValidationError::ZeroBackoff);
    }

    if config.monitor.tag_prefix.is_empty() {
        errors.push(ValidationError::EmptyPrefix);
    }

    if config.monitor.nodes.iter().any(|n| n.trim().is_empty()) {
        errors.push(ValidationError::EmptyNodeName);
    }

    if config.templates.fetch_timeout_secs == 0 {
        errors.push(ValidationError::ZeroFetchTimeout);
    }

    if config.datadog.process_name.is_empty() {
        errors.push(ValidationError::EmptyProcessName);
    }

    if config.datadog.min_reload_interval_secs == 0 {
        errors.push(ValidationError::ZeroReloadInterval);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
