//! Monitor declarations encoded in service tags.
//!
//! A tag `<prefix><template> <monitor type>` declares one monitor. Anything
//! else is ignored; prefixed tags that do not split into exactly two fields
//! are reported as [`TagParseError`] so the caller can skip them.

use thiserror::Error;

use crate::catalog::types::{CatalogService, MonitorDeclaration, Service};

/// Separates the template locator from the monitor type.
pub const FIELD_DELIMITER: char = ' ';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagParseError {
    #[error("tag '{0}' has no monitor type (expected '<template> <type>')")]
    MissingDelimiter(String),

    #[error("tag '{0}' has an empty template or monitor type")]
    EmptyField(String),

    #[error("tag '{tag}' names monitor type '{monitor_type}', which is not a valid file name")]
    InvalidType { tag: String, monitor_type: String },
}

/// Parse a single tag.
///
/// Returns `Ok(None)` for tags without the prefix.
pub fn parse_tag(prefix: &str, tag: &str) -> Result<Option<MonitorDeclaration>, TagParseError> {
    let Some(rest) = tag.strip_prefix(prefix) else {
        return Ok(None);
    };

    let (template, monitor_type) = rest
        .split_once(FIELD_DELIMITER)
        .ok_or_else(|| TagParseError::MissingDelimiter(tag.to_string()))?;

    let template = template.trim();
    let monitor_type = monitor_type.trim();
    if template.is_empty() || monitor_type.is_empty() {
        return Err(TagParseError::EmptyField(tag.to_string()));
    }

    // The type becomes `<output_dir>/<type>.yaml`.
    if monitor_type.contains(['/', '\\']) || monitor_type.contains("..") {
        return Err(TagParseError::InvalidType {
            tag: tag.to_string(),
            monitor_type: monitor_type.to_string(),
        });
    }

    Ok(Some(MonitorDeclaration {
        template: template.to_string(),
        monitor_type: monitor_type.to_string(),
    }))
}

/// Turn a catalog entry into a [`Service`], or `None` when it declares no
/// monitors. Malformed prefixed tags are logged and skipped.
pub fn extract_service(prefix: &str, node: &str, entry: CatalogService) -> Option<Service> {
    let mut monitors = Vec::new();

    for tag in &entry.tags {
        match parse_tag(prefix, tag) {
            Ok(Some(monitor)) => monitors.push(monitor),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    node = %node,
                    service_id = %entry.id,
                    error = %e,
                    "Skipping malformed monitor tag"
                );
            }
        }
    }

    if monitors.is_empty() {
        return None;
    }

    Some(Service {
        id: entry.id,
        name: entry.name,
        node: node.to_string(),
        address: entry.address,
        port: entry.port,
        tags: entry.tags,
        monitors,
    })
}
