//! Check templates: Tera text that renders into a [`CheckConfig`].
//!
//! A template is accepted only if rendering it against a fixed dummy service
//! produces a valid check document. Rendering happens before YAML parsing so
//! templates may start scalars with `{{`.
//!
//! Service fields are also exposed under their catalog names (`ID`,
//! `Service`, `Node`, `Address`, `Port`, `Tags`), so a template written as
//! `{{ .Address }}` ports by dropping the leading dot: `{{ Address }}`.

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::catalog::types::{MonitorDeclaration, Service};
use crate::materialize::check::CheckConfig;

/// Errors from resolving, compiling, validating or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid template locator '{0}'")]
    Locator(String),

    #[error("cannot build template HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("could not download template {locator}: {source}")]
    Download {
        locator: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not read template {locator}: {source}")]
    Read {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template {locator} does not compile: {source}")]
    Compile {
        locator: String,
        #[source]
        source: tera::Error,
    },

    #[error("template {locator} failed to render: {source}")]
    Render {
        locator: String,
        #[source]
        source: tera::Error,
    },

    #[error("template {locator} does not render to init_config/instances YAML: {source}")]
    Schema {
        locator: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Fields exposed to templates.
#[derive(Debug, Serialize)]
pub struct RenderContext<'a> {
    pub id: &'a str,
    pub service: &'a str,
    pub node: &'a str,
    pub address: &'a str,
    pub port: u16,
    pub tags: &'a [String],
    pub monitor_type: &'a str,
    pub template: &'a str,
    #[serde(flatten)]
    pub catalog_names: CatalogNames<'a>,
}

/// The service fields again, spelled the way the Consul catalog spells them.
#[derive(Debug, Serialize)]
pub struct CatalogNames<'a> {
    #[serde(rename = "ID")]
    pub id: &'a str,
    #[serde(rename = "Service")]
    pub service: &'a str,
    #[serde(rename = "Node")]
    pub node: &'a str,
    #[serde(rename = "Address")]
    pub address: &'a str,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Tags")]
    pub tags: &'a [String],
}

impl<'a> RenderContext<'a> {
    pub fn new(service: &'a Service, monitor: &'a MonitorDeclaration) -> Self {
        Self {
            id: &service.id,
            service: &service.name,
            node: &service.node,
            address: &service.address,
            port: service.port,
            tags: &service.tags,
            monitor_type: &monitor.monitor_type,
            template: &monitor.template,
            catalog_names: CatalogNames {
                id: &service.id,
                service: &service.name,
                node: &service.node,
                address: &service.address,
                port: service.port,
                tags: &service.tags,
            },
        }
    }
}

/// The synthetic record every template is checked against.
pub fn dummy_service(monitor: &MonitorDeclaration) -> Service {
    Service {
        id: "test-service-ID".to_string(),
        name: "test-service".to_string(),
        node: "test-node".to_string(),
        address: "127.0.0.1".to_string(),
        port: 9999,
        tags: vec!["tag1".to_string(), "tag2".to_string()],
        monitors: vec![monitor.clone()],
    }
}

/// A compiled, validated template.
#[derive(Debug, Clone)]
pub struct CheckTemplate {
    locator: String,
    tera: Tera,
}

impl CheckTemplate {
    /// Compile `raw` and validate it against the dummy service for `monitor`.
    pub fn compile(monitor: &MonitorDeclaration, raw: &str) -> Result<Self, TemplateError> {
        let locator = monitor.template.clone();

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_template(&locator, raw)
            .map_err(|source| TemplateError::Compile {
                locator: locator.clone(),
                source,
            })?;

        let template = Self { locator, tera };
        template.render(&dummy_service(monitor), monitor)?;
        Ok(template)
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Render for one service and parse the result.
    pub fn render(&self, service: &Service, monitor: &MonitorDeclaration) -> Result<CheckConfig, TemplateError> {
        let context = Context::from_serialize(RenderContext::new(service, monitor)).map_err(|source| {
            TemplateError::Render {
                locator: self.locator.clone(),
                source,
            }
        })?;

        let text = self
            .tera
            .render(&self.locator, &context)
            .map_err(|source| TemplateError::Render {
                locator: self.locator.clone(),
                source,
            })?;

        CheckConfig::from_yaml(&text).map_err(|source| TemplateError::Schema {
            locator: self.locator.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    const HTTP_TEMPLATE: &str = r#"init_config:
  default_timeout: 5
instances:
  - name: {{ service }}-{{ id }}
    url: http://{{ address }}:{{ port }}/health
    tags:
{% for tag in tags %}      - {{ tag }}
{% endfor %}      - node:{{ node }}
"#;

    fn monitor(template: &str) -> MonitorDeclaration {
        MonitorDeclaration {
            template: template.into(),
            monitor_type: "http_check".into(),
        }
    }

    fn service() -> Service {
        Service {
            id: "web-1".into(),
            name: "web".into(),
            node: "n1".into(),
            address: "10.1.2.3".into(),
            port: 8080,
            tags: vec!["primary".into()],
            monitors: vec![monitor("http.yaml")],
        }
    }

    #[test]
    fn test_render_real_service() {
        let m = monitor("http.yaml");
        let template = CheckTemplate::compile(&m, HTTP_TEMPLATE).unwrap();
        let config = template.render(&service(), &m).unwrap();

        assert_eq!(config.init_config.get("default_timeout"), Some(&Value::from(5)));
        assert_eq!(config.instances.len(), 1);
        let instance = &config.instances[0];
        assert_eq!(instance["name"], Value::from("web-web-1"));
        assert_eq!(instance["url"], Value::from("http://10.1.2.3:8080/health"));
        assert_eq!(instance["tags"][0], Value::from("primary"));
        assert_eq!(instance["tags"][1], Value::from("node:n1"));
    }

    #[test]
    fn test_leading_placeholder_is_fine() {
        let m = monitor("tcp.yaml");
        let raw = "instances:\n  - host: {{ address }}\n    port: {{ port }}\n";
        let config = CheckTemplate::compile(&m, raw)
            .unwrap()
            .render(&service(), &m)
            .unwrap();
        assert_eq!(config.instances[0]["port"], Value::from(8080));
    }

    #[test]
    fn test_syntax_error_fails_compile() {
        let err = CheckTemplate::compile(&monitor("bad.yaml"), "instances: {{ address").unwrap_err();
        assert!(matches!(err, TemplateError::Compile { .. }));
    }

    #[test]
    fn test_wrong_shape_fails_validation() {
        let err = CheckTemplate::compile(&monitor("list.yaml"), "- url: {{ address }}\n").unwrap_err();
        assert!(matches!(err, TemplateError::Schema { .. }));

        let err = CheckTemplate::compile(&monitor("noinst.yaml"), "init_config: {}\n").unwrap_err();
        assert!(matches!(err, TemplateError::Schema { .. }));
    }

    #[test]
    fn test_unknown_variable_fails_validation() {
        let err = CheckTemplate::compile(&monitor("typo.yaml"), "instances:\n  - host: {{ adress }}\n")
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
        assert!(err.to_string().contains("typo.yaml"));
    }

    #[test]
    fn test_catalog_spelled_names_render() {
        let m = monitor("tcp.yaml");
        let raw = "instances:\n  - host: {{ Address }}\n    port: {{ Port }}\n    id: {{ ID }}\n    name: {{ Service }}\n    node: {{ Node }}\n    tags: [{{ Tags | join(sep=\",\") }}]\n";
        let config = CheckTemplate::compile(&m, raw)
            .unwrap()
            .render(&service(), &m)
            .unwrap();

        let instance = &config.instances[0];
        assert_eq!(instance["host"], Value::from("10.1.2.3"));
        assert_eq!(instance["port"], Value::from(8080));
        assert_eq!(instance["id"], Value::from("web-1"));
        assert_eq!(instance["name"], Value::from("web"));
        assert_eq!(instance["node"], Value::from("n1"));
        assert_eq!(instance["tags"][0], Value::from("primary"));
    }
}
