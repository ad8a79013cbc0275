//! Template resolution.
//!
//! # Locators
//! - `http://…` / `https://…`: downloaded into a temporary file under the
//!   configured temp directory, read back, and removed when the handle drops
//! - `file://…`: read from the URL's path
//! - anything else: a path, relative ones resolved against the template root
//!
//! Downloads are bounded by `templates.fetch_timeout_secs`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TemplateConfig;
use crate::materialize::template::TemplateError;

/// Resolves a locator to raw template text.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<String, TemplateError>;
}

/// Local files and remote URLs behind one interface.
#[derive(Debug, Clone)]
pub struct LocatorSource {
    root: PathBuf,
    temp_dir: PathBuf,
    http: reqwest::Client,
}

enum Location {
    Remote(url::Url),
    Local(PathBuf),
}

impl LocatorSource {
    pub fn new(config: &TemplateConfig) -> Result<Self, TemplateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(TemplateError::Client)?;

        Ok(Self {
            root: config.root.clone(),
            temp_dir: config.temp_dir.clone(),
            http,
        })
    }

    fn locate(&self, locator: &str) -> Result<Location, TemplateError> {
        if let Ok(url) = url::Url::parse(locator) {
            match url.scheme() {
                "http" | "https" => return Ok(Location::Remote(url)),
                "file" => {
                    return url
                        .to_file_path()
                        .map(Location::Local)
                        .map_err(|_| TemplateError::Locator(locator.to_string()));
                }
                _ => {}
            }
        }

        let path = Path::new(locator);
        if path.is_absolute() {
            Ok(Location::Local(path.to_path_buf()))
        } else {
            Ok(Location::Local(self.root.join(path)))
        }
    }

    async fn download(&self, locator: &str, url: url::Url) -> Result<String, TemplateError> {
        let fetch_err = |e: reqwest::Error| TemplateError::Download {
            locator: locator.to_string(),
            source: e,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_err)?;
        let body = response.bytes().await.map_err(fetch_err)?;

        let io_err = |e: std::io::Error| TemplateError::Read {
            locator: locator.to_string(),
            source: e,
        };

        // Dropping `staged` removes the file whatever happens below.
        let mut staged = tempfile::Builder::new()
            .prefix("consuldog-template-")
            .tempfile_in(&self.temp_dir)
            .map_err(io_err)?;
        staged.write_all(&body).map_err(io_err)?;
        staged.flush().map_err(io_err)?;

        let text = fs::read_to_string(staged.path()).map_err(io_err)?;
        tracing::debug!(locator = %locator, bytes = body.len(), "Downloaded template");
        Ok(text)
    }
}

#[async_trait]
impl TemplateSource for LocatorSource {
    async fn fetch(&self, locator: &str) -> Result<String, TemplateError> {
        match self.locate(locator)? {
            Location::Remote(url) => self.download(locator, url).await,
            Location::Local(path) => {
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| TemplateError::Read {
                        locator: locator.to_string(),
                        source: e,
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(root: &Path, temp: &Path) -> LocatorSource {
        LocatorSource::new(&TemplateConfig {
            root: root.to_path_buf(),
            temp_dir: temp.to_path_buf(),
            fetch_timeout_secs: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_relative_and_absolute_paths() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("http.yaml"), "instances: []").unwrap();
        let src = source(root.path(), root.path());

        assert_eq!(src.fetch("http.yaml").await.unwrap(), "instances: []");

        let absolute = root.path().join("http.yaml");
        assert_eq!(src.fetch(absolute.to_str().unwrap()).await.unwrap(), "instances: []");

        let file_url = url::Url::from_file_path(&absolute).unwrap();
        assert_eq!(src.fetch(file_url.as_str()).await.unwrap(), "instances: []");
    }

    #[tokio::test]
    async fn test_missing_file_names_locator() {
        let root = tempfile::tempdir().unwrap();
        let err = source(root.path(), root.path())
            .fetch("nope.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_download_error() {
        let root = tempfile::tempdir().unwrap();
        let err = source(root.path(), root.path())
            .fetch("http://127.0.0.1:1/t.yaml")
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::Download { .. }));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections without ever answering.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let root = tempfile::tempdir().unwrap();
        let src = source(root.path(), root.path());
        let url = format!("http://{addr}/t.yaml");
        let fetch = src.fetch(&url);
        let err = tokio::time::timeout(Duration::from_secs(10), fetch)
            .await
            .expect("download was not bounded")
            .unwrap_err();
        assert!(matches!(err, TemplateError::Download { .. }));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
