//! Consul HTTP catalog client.
//!
//! # Responsibilities
//! - Issue blocking node queries (`/v1/catalog/node/<node>`)
//! - Resolve the node name of the connected agent (`/v1/agent/self`)
//! - Bound every request with a timeout slightly above the blocking wait

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use crate::catalog::types::{CatalogError, CatalogResult, CatalogService, NodeServices};
use crate::config::ConsulConfig;

const INDEX_HEADER: &str = "X-Consul-Index";
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Slack on top of the blocking wait before a request is abandoned.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(30);

/// The catalog operations the watcher depends on.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Blocking "get node": returns once the node's index moves past
    /// `wait_index` or the server-side wait expires.
    async fn node_services(&self, node: &str, wait_index: u64) -> CatalogResult<NodeServices>;

    /// Name of the node the connected agent runs on.
    async fn agent_node_name(&self) -> CatalogResult<String>;
}

#[derive(Debug, Deserialize)]
struct CatalogNodeResponse {
    #[serde(rename = "Node")]
    node: Option<NodeInfo>,
    #[serde(rename = "Services", default)]
    services: Option<HashMap<String, AgentService>>,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    #[serde(rename = "Node")]
    node: String,
    #[serde(rename = "Address", default)]
    address: String,
}

#[derive(Debug, Deserialize)]
struct AgentService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "Tags", default)]
    tags: Option<Vec<String>>,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port", default)]
    port: u16,
}

#[derive(Debug, Deserialize)]
struct AgentSelf {
    #[serde(rename = "Config")]
    config: AgentSelfConfig,
}

#[derive(Debug, Deserialize)]
struct AgentSelfConfig {
    #[serde(rename = "NodeName")]
    node_name: String,
}

/// Consul catalog client over HTTP.
#[derive(Clone)]
pub struct ConsulClient {
    http: reqwest::Client,
    base: url::Url,
    token: Option<String>,
    wait: Duration,
}

impl ConsulClient {
    /// Create a new client. Fails only on an unusable address or when the
    /// HTTP client cannot be built.
    pub fn new(config: &ConsulConfig) -> CatalogResult<Self> {
        let base = url::Url::parse(&config.address)
            .map_err(|_| CatalogError::Address(config.address.clone()))?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::Address(config.address.clone()));
        }

        let wait = Duration::from_secs(config.wait_secs);
        let http = reqwest::Client::builder()
            .timeout(wait + REQUEST_TIMEOUT_SLACK)
            .build()?;

        tracing::info!(address = %config.address, wait_secs = config.wait_secs, "Consul client initialized");

        Ok(Self {
            http,
            base,
            token: config.token.clone(),
            wait,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> CatalogResult<url::Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::Address(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: url::Url) -> CatalogResult<reqwest::Response> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(response)
    }
}

fn parse_index(headers: &HeaderMap) -> CatalogResult<u64> {
    headers
        .get(INDEX_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .ok_or(CatalogError::MissingIndex)
}

#[async_trait]
impl Catalog for ConsulClient {
    async fn node_services(&self, node: &str, wait_index: u64) -> CatalogResult<NodeServices> {
        let mut url = self.endpoint(&["v1", "catalog", "node", node])?;
        url.query_pairs_mut()
            .append_pair("index", &wait_index.to_string())
            .append_pair("wait", &format!("{}s", self.wait.as_secs()))
            .append_pair("stale", "");

        let response = self.get(url).await?;
        let index = parse_index(response.headers())?;
        let body = response.bytes().await?;

        // Unknown nodes come back as a literal `null`.
        let parsed: Option<CatalogNodeResponse> =
            serde_json::from_slice(&body).map_err(|e| CatalogError::Decode(e.to_string()))?;

        let Some(parsed) = parsed else {
            return Ok(NodeServices {
                index,
                node: node.to_string(),
                services: Vec::new(),
            });
        };

        let (node_name, node_address) = match parsed.node {
            Some(info) => (info.node, info.address),
            None => (node.to_string(), String::new()),
        };

        let mut services: Vec<CatalogService> = parsed
            .services
            .unwrap_or_default()
            .into_values()
            .map(|s| CatalogService {
                id: s.id,
                name: s.service,
                // An empty service address means "same as the node".
                address: if s.address.is_empty() {
                    node_address.clone()
                } else {
                    s.address
                },
                port: s.port,
                tags: s.tags.unwrap_or_default(),
            })
            .collect();
        // JSON object order is not meaningful; keep snapshots stable.
        services.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(NodeServices {
            index,
            node: node_name,
            services,
        })
    }

    async fn agent_node_name(&self) -> CatalogResult<String> {
        let url = self.endpoint(&["v1", "agent", "self"])?;
        let response = self.get(url).await?;
        let agent: AgentSelf = response.json().await?;
        Ok(agent.config.node_name)
    }
}

impl std::fmt::Debug for ConsulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulClient")
            .field("address", &self.base.as_str())
            .field("wait_secs", &self.wait.as_secs())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
