// # HTTP Candidate Source
//
// Downloads the newline-separated candidate list from a URL.
//
// ## Behavior
//
// - Exactly one GET per run, bounded by the configured timeout
// - Non-2xx responses and transport failures are candidate-source errors,
//   which the engine treats as fatal
// - The body is split into lines as-is; blank lines are left for the
//   worker pool to skip

use fastip_core::config::SourceConfig;
use fastip_core::registry::ComponentRegistry;
use fastip_core::traits::{CandidateSource, CandidateSourceFactory, split_candidate_list};
use fastip_core::{Error, Result};

use std::time::Duration;

/// Default request timeout for the list download
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP-based candidate list source
pub struct HttpCandidateSource {
    /// URL of the list
    url: String,

    /// HTTP client with the request timeout applied
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpCandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCandidateSource")
            .field("url", &self.url)
            .finish()
    }
}

impl HttpCandidateSource {
    /// Create a new HTTP candidate source
    ///
    /// # Parameters
    ///
    /// - `url`: URL of the newline-separated list
    /// - `timeout`: Whole-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create with the default 10 second timeout
    pub fn with_default_timeout(url: impl Into<String>) -> Result<Self> {
        Self::new(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl CandidateSource for HttpCandidateSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        tracing::debug!("Downloading candidate list from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::candidate_source(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::candidate_source(format!(
                "Candidate list download from {} returned {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::candidate_source(format!("Failed to read response: {}", e)))?;

        let entries = split_candidate_list(&body);
        tracing::info!(
            "Downloaded {} candidate entr(ies) from {}",
            entries.len(),
            self.url
        );
        Ok(entries)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP candidate sources
pub struct HttpSourceFactory;

impl CandidateSourceFactory for HttpSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn CandidateSource>> {
        match config {
            SourceConfig::Http { url, timeout_secs } => Ok(Box::new(HttpCandidateSource::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config("Invalid config for HTTP candidate source")),
        }
    }
}

/// Register the HTTP candidate source with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_candidate_source("http", Box::new(HttpSourceFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request with `status_line` and `body`
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/ips.txt", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "{}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        });

        url
    }

    #[test]
    fn test_factory_creation() {
        let config = SourceConfig::Http {
            url: "https://example.com/ips.txt".to_string(),
            timeout_secs: 10,
        };

        let source = HttpSourceFactory.create(&config).unwrap();
        assert_eq!(source.source_name(), "http");
    }

    #[test]
    fn test_factory_rejects_other_config() {
        let config = SourceConfig::File {
            path: "/tmp/ips.txt".to_string(),
        };
        assert!(matches!(
            HttpSourceFactory.create(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_register() {
        let registry = ComponentRegistry::new();
        register(&registry);
        assert!(registry.has_candidate_source("http"));
    }

    #[tokio::test]
    async fn test_fetch_splits_lines() {
        let url = serve_once("HTTP/1.1 200 OK", "104.16.0.1\r\n\n104.16.0.2\n").await;
        let source = HttpCandidateSource::with_default_timeout(url).unwrap();

        let entries = source.fetch().await.unwrap();
        assert_eq!(entries, vec!["104.16.0.1", "", "104.16.0.2", ""]);
    }

    #[tokio::test]
    async fn test_non_success_status_is_source_error() {
        let url = serve_once("HTTP/1.1 404 Not Found", "missing").await;
        let source = HttpCandidateSource::with_default_timeout(url).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, Error::CandidateSource(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unreachable_url_is_source_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source =
            HttpCandidateSource::new(format!("http://{}/ips.txt", addr), Duration::from_secs(2))
                .unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(Error::CandidateSource(_))
        ));
    }
}
