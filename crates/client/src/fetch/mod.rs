//! Upstream fetch pipeline.
//!
//! One network attempt per request, no retries. Transport failures (refused
//! connection, DNS, timeout) surface as errors. HTTP error statuses do not:
//! the strategies forward non-success responses to the caller uncached, so
//! the fetcher returns them as values.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};

use sojourn_core::{CapturedResponse, Error};

/// Configuration for the upstream client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sojourn-gateway/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "sojourn-gateway/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20_000),
        }
    }
}

/// Network seam the gateway strategies are written against.
///
/// The production implementation is [`UpstreamClient`]; tests substitute a
/// scripted fetcher.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform a single network attempt for `method` `url`.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport-level failures; HTTP responses of
    /// any status are returned as `Ok`.
    async fn fetch(&self, method: &str, url: &Url) -> Result<CapturedResponse, Error>;
}

/// HTTP client for the configured first-party upstream.
pub struct UpstreamClient {
    http: Client,
    config: FetchConfig,
}

impl UpstreamClient {
    /// Create a new upstream client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetch for UpstreamClient {
    async fn fetch(&self, method: &str, url: &Url) -> Result<CapturedResponse, Error> {
        let start = Instant::now();

        let method: reqwest::Method = method
            .parse()
            .map_err(|_| Error::Transport(format!("invalid method: {method}")))?;

        let response = self
            .http
            .request(method, url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(url.to_string())
                } else {
                    Error::Transport(format!("network error: {e}"))
                }
            })?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(%url, status, bytes = body.len(), ms = start.elapsed().as_millis() as u64, "fetched upstream");

        Ok(CapturedResponse { status, headers, body: body.to_vec() })
    }
}
