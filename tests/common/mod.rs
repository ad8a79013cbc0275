//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

use consuldog::catalog::types::{CatalogResult, CatalogService, NodeServices};
use consuldog::catalog::{Catalog, CatalogError};
use consuldog::reload::{ProcessInfo, ProcessTable, ReloadError};

/// A canned HTTP response.
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn json(index: u64, body: &str) -> Self {
        Self {
            status: 200,
            headers: vec![("X-Consul-Index", index.to_string())],
            body: body.to_string(),
        }
    }
}

/// Start a programmable HTTP server on an ephemeral port. The handler gets
/// the raw request head (request line + headers).
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let response = f(String::from_utf8_lossy(&head).into_owned()).await;
                let status_text = match response.status {
                    200 => "200 OK",
                    403 => "403 Forbidden",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let mut out = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                    status_text,
                    response.body.len()
                );
                for (name, value) in &response.headers {
                    out.push_str(&format!("{name}: {value}\r\n"));
                }
                out.push_str("\r\n");
                out.push_str(&response.body);

                let _ = socket.write_all(out.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a server that accepts connections and never answers. The counter
/// tracks accepted connections.
pub async fn start_stalled_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    (addr, accepted)
}

pub type Scripted = Result<NodeServices, CatalogError>;

/// Catalog fake driven by per-node channels. A query blocks until the test
/// pushes the next response, like a long-poll that has nothing new yet.
#[derive(Default)]
pub struct ScriptedCatalog {
    nodes: HashMap<String, Mutex<mpsc::UnboundedReceiver<Scripted>>>,
    pub queries: AtomicUsize,
}

impl ScriptedCatalog {
    pub fn new(nodes: &[&str]) -> (Self, HashMap<String, mpsc::UnboundedSender<Scripted>>) {
        let mut catalog = Self::default();
        let mut senders = HashMap::new();
        for node in nodes {
            let (tx, rx) = mpsc::unbounded_channel();
            catalog.nodes.insert(node.to_string(), Mutex::new(rx));
            senders.insert(node.to_string(), tx);
        }
        (catalog, senders)
    }
}

#[async_trait]
impl Catalog for ScriptedCatalog {
    async fn node_services(&self, node: &str, _wait_index: u64) -> CatalogResult<NodeServices> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let Some(rx) = self.nodes.get(node) else {
            return std::future::pending().await;
        };
        match rx.lock().await.recv().await {
            Some(response) => response,
            None => std::future::pending().await,
        }
    }

    async fn agent_node_name(&self) -> CatalogResult<String> {
        Ok("local".into())
    }
}

pub fn catalog_service(id: &str, tags: &[&str]) -> CatalogService {
    CatalogService {
        id: id.into(),
        name: format!("{id}-svc"),
        address: "10.0.0.7".into(),
        port: 8080,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn node_services(node: &str, index: u64, services: Vec<CatalogService>) -> Scripted {
    Ok(NodeServices {
        index,
        node: node.into(),
        services,
    })
}

/// Process table with one fake agent; counts delivered signals.
#[derive(Clone, Default)]
pub struct CountingProcesses {
    pub signals: Arc<AtomicUsize>,
}

impl ProcessTable for CountingProcesses {
    fn refresh(&mut self) {}

    fn processes(&self) -> Vec<ProcessInfo> {
        vec![ProcessInfo {
            pid: 4242,
            name: "supervisord".into(),
            effective_uid: None,
        }]
    }

    fn current_effective_uid(&self) -> Option<u32> {
        None
    }

    fn send_reload(&self, _pid: u32) -> Result<(), ReloadError> {
        self.signals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually<F: FnMut() -> bool>(mut check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
