//! Per-type aggregation of rendered check templates.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::types::MonitorDeclaration;
use crate::materialize::check::CheckConfig;
use crate::materialize::source::TemplateSource;
use crate::materialize::template::{CheckTemplate, TemplateError};
use crate::materialize::writer::write_if_changed;
use crate::observability::metrics;
use crate::registry::ServiceRegistry;

/// What a materialization pass did, per monitor type.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Types whose file was (re)written.
    pub written: Vec<String>,
    /// Types whose file already had the rendered content.
    pub unchanged: Vec<String>,
    /// Types that could not be serialized or written.
    pub failed: Vec<String>,
    /// Template locators rejected during this pass.
    pub rejected_templates: Vec<String>,
    /// (service, template) pairs left out of their type's aggregate.
    pub skipped: usize,
}

impl MaterializeReport {
    /// Whether any output file changed on disk.
    pub fn changed(&self) -> bool {
        !self.written.is_empty()
    }
}

/// Renders the registry into one `<type>.yaml` per monitor type.
pub struct Materializer<S: ?Sized> {
    source: Arc<S>,
    output_dir: PathBuf,
}

impl<S: TemplateSource + ?Sized> Materializer<S> {
    pub fn new(source: Arc<S>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output file for a monitor type.
    pub fn output_path(&self, monitor_type: &str) -> PathBuf {
        self.output_dir.join(format!("{monitor_type}.yaml"))
    }

    /// Fetch and validate one template.
    pub async fn load_template(&self, monitor: &MonitorDeclaration) -> Result<CheckTemplate, TemplateError> {
        let raw = self.source.fetch(&monitor.template).await?;
        CheckTemplate::compile(monitor, &raw)
    }

    /// Run one full pass over the registry.
    pub async fn materialize(&self, registry: &ServiceRegistry) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        let monitor_types = registry.monitor_types();

        // Every distinct locator is fetched and validated once per pass.
        let mut seen = HashSet::new();
        let mut templates: HashMap<String, CheckTemplate> = HashMap::new();
        for monitor_type in &monitor_types {
            for entry in registry.monitors_of_type(monitor_type) {
                if !seen.insert(entry.monitor.template.clone()) {
                    continue;
                }
                match self.load_template(&entry.monitor).await {
                    Ok(template) => {
                        templates.insert(entry.monitor.template.clone(), template);
                    }
                    Err(e) => {
                        tracing::warn!(
                            template = %entry.monitor.template,
                            error = %e,
                            "Template rejected, services using it are skipped this pass"
                        );
                        metrics::record_template_failure("load");
                        report.rejected_templates.push(entry.monitor.template.clone());
                    }
                }
            }
        }

        for monitor_type in monitor_types {
            let mut aggregate = CheckConfig::default();

            for entry in registry.monitors_of_type(monitor_type) {
                let Some(template) = templates.get(&entry.monitor.template) else {
                    tracing::warn!(
                        template = %entry.monitor.template,
                        service = %entry.service.name,
                        service_id = %entry.service.id,
                        "No valid template for service, skipping"
                    );
                    report.skipped += 1;
                    continue;
                };

                match template.render(&entry.service, &entry.monitor) {
                    Ok(fragment) => aggregate.merge(fragment),
                    Err(e) => {
                        tracing::warn!(
                            service = %entry.service.name,
                            service_id = %entry.service.id,
                            error = %e,
                            "Could not render template for service, skipping"
                        );
                        metrics::record_template_failure("render");
                        report.skipped += 1;
                    }
                }
            }

            self.write(monitor_type, &aggregate, &mut report);
        }

        tracing::debug!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "Materialization pass finished"
        );
        report
    }

    fn write(&self, monitor_type: &str, config: &CheckConfig, report: &mut MaterializeReport) {
        let yaml = match config.to_yaml() {
            Ok(yaml) => yaml,
            Err(e) => {
                tracing::error!(monitor_type = %monitor_type, error = %e, "Could not serialize check config");
                report.failed.push(monitor_type.to_string());
                return;
            }
        };

        let path = self.output_path(monitor_type);
        match write_if_changed(&path, &yaml) {
            Ok(true) => {
                tracing::info!(
                    monitor_type = %monitor_type,
                    path = %path.display(),
                    instances = config.instances.len(),
                    "Wrote check config"
                );
                metrics::record_config_write(monitor_type, true);
                report.written.push(monitor_type.to_string());
            }
            Ok(false) => report.unchanged.push(monitor_type.to_string()),
            Err(e) => {
                tracing::error!(
                    monitor_type = %monitor_type,
                    path = %path.display(),
                    error = %e,
                    "Could not write check config, previous file left in place"
                );
                metrics::record_config_write(monitor_type, false);
                report.failed.push(monitor_type.to_string());
            }
        }
    }
}
