//! HTTP fetch pipeline with bounded-backoff retries.
//!
//! ### Outcomes
//! - `200`: the body bytes and declared content type.
//! - `404`: [`Error::NotFound`], terminal and never retried.
//! - Anything else (other statuses, transport errors): [`Error::FetchFailure`],
//!   retried by [`RetryingFetcher`]. 429/503 carry a rate-limit hint.
//! - Non-http(s) URLs: [`Error::InvalidUrl`], never sent and never retried.
//!
//! ### Transport
//! - rustls, gzip/brotli/deflate, at most 5 redirects.
//! - No timeout unless one is configured.

pub mod retry;
pub mod url;

use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use retry::{Attempt, RetryPolicy, RetryingFetcher};
pub use self::url::{UrlError, canonicalize, origin_path, resolve};

use mapmirror_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "mapmirror/<version>")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("mapmirror/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Response from a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
}

impl FetchResponse {
    /// Media type without parameters, e.g. `image/png`.
    pub fn media_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
    }
}

/// A single-attempt transport.
///
/// Retries live in [`RetryingFetcher`]; implementations only classify the
/// outcome of one request.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(|e| Error::FetchFailure {
            url: String::new(),
            reason: format!("failed to build HTTP client: {}", e),
            hint: None,
        })?;

        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("unsupported scheme: {url}")));
        }

        let start = Instant::now();

        let response = self.http.get(url.as_str()).send().await.map_err(|e| Error::FetchFailure {
            url: url.to_string(),
            reason: format!("network error: {}", e),
            hint: None,
        })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.to_string()));
        }

        if !status.is_success() {
            return Err(Error::from_status(url.as_str(), status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| Error::FetchFailure {
            url: url.to_string(),
            reason: format!("failed to read response: {}", e),
            hint: None,
        })?;

        tracing::debug!(
            "fetched {} in {}ms ({} bytes)",
            url,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(FetchResponse { url: url.clone(), status, content_type, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert!(config.user_agent.starts_with("mapmirror/"));
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "probe/1".into(), timeout_ms: Some(2000), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "probe/1");
        assert_eq!(config.timeout, Some(Duration::from_millis(2000)));
    }

    #[test]
    fn test_media_type_strips_parameters() {
        let response = FetchResponse {
            url: Url::parse("https://example.com/a.css").unwrap(),
            status: StatusCode::OK,
            content_type: Some("text/css; charset=utf-8".to_string()),
            bytes: Bytes::new(),
        };
        assert_eq!(response.media_type(), Some("text/css"));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/data/world.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"markers":[]}"#)
            .create_async()
            .await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/data/world.json", server.url())).unwrap();
        let response = client.get(&url).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.media_type(), Some("application/json"));
        assert_eq!(&response.bytes[..], br#"{"markers":[]}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing.png").with_status(404).create_async().await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/missing.png", server.url())).unwrap();
        let err = client.get(&url).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fetch_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/tile.png").with_status(429).create_async().await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/tile.png", server.url())).unwrap();
        let err = client.get(&url).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains(mapmirror_core::error::RATE_LIMIT_HINT));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_fails_without_retry() {
        let client = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        let url = Url::parse("ftp://map.example.com/tiles/0/0/0.png").unwrap();

        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert!(!err.is_retryable());

        let fetcher = RetryingFetcher::new(client, RetryPolicy::default());
        assert!(matches!(fetcher.fetch(&url).await, Err(Error::InvalidUrl(_))));
        assert_eq!(fetcher.requests(), 1);
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/boom").with_status(500).create_async().await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/boom", server.url())).unwrap();
        let err = client.get(&url).await.unwrap_err();
        assert!(matches!(err, Error::FetchFailure { hint: None, .. }));
    }
}
