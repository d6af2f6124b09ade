//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the crawler's user agent and timeout
//! - GET requests to fetch page content
//! - Retry logic with exponential backoff for transient failures
//! - Error classification

use reqwest::header::{CONTENT_TYPE, LAST_MODIFIED};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Longest pause between two attempts
const MAX_BACKOFF_MS: u64 = 30_000;

/// Per-URL fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Returns true for failures worth another attempt
    ///
    /// Timeouts, connection errors and 5xx responses are transient; 4xx
    /// responses and everything else are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) => true,
            Self::Status(code) => *code >= 500,
            Self::Body(_) | Self::Request(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,
    /// Final URL after redirects
    pub final_url: Url,
    /// Content-Type header value (empty when absent)
    pub content_type: String,
    /// Raw Last-Modified header value
    pub last_modified_header: Option<String>,
    /// Response body; only read for HTML responses
    pub body: String,
}

impl FetchedPage {
    /// Returns true if the response declares an HTML content type
    pub fn is_html(&self) -> bool {
        self.content_type.to_lowercase().contains("text/html")
    }
}

/// Exponential backoff: `base * 2^attempt`, capped
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    /// Delay before retry number `attempt` (0 is the first retry)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(20)));
        Duration::from_millis(exponential.min(self.max_ms))
    }
}

/// How often and how patiently a fetch is retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a policy with `retries` extra attempts starting at `backoff_ms`
    pub fn new(retries: u32, backoff_ms: u64) -> Self {
        Self {
            retries,
            backoff: Backoff::new(backoff_ms, MAX_BACKOFF_MS),
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, 0)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header sent with every request
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sitemap_ripple::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("SitemapGenerator/1.0", Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, retrying transient failures
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Success |
/// | HTTP 4xx | Immediate failure |
/// | HTTP 5xx | Retry with backoff |
/// | Timeout | Retry with backoff |
/// | Connection refused | Retry with backoff |
/// | Anything else | Immediate failure |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `timeout` - Timeout for each attempt
/// * `retry` - Retry count and backoff
///
/// # Returns
///
/// The fetched page, or the error of the last attempt
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
    retry: RetryPolicy,
) -> Result<FetchedPage, FetchError> {
    let mut attempt = 0;

    loop {
        match fetch_once(client, url, timeout).await {
            Ok(page) => return Ok(page),
            Err(e) if e.is_retryable() && attempt < retry.retries => {
                let delay = retry.backoff.delay(attempt);
                tracing::debug!(
                    "Fetch of {} failed ({}), retrying in {:?}",
                    url,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_once(client: &Client, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
    let response = client.get(url.clone()).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let final_url = response.url().clone();
    let content_type = header_value(&response, CONTENT_TYPE).unwrap_or_default();
    let last_modified_header = header_value(&response, LAST_MODIFIED);

    let mut page = FetchedPage {
        status: status.as_u16(),
        final_url,
        content_type,
        last_modified_header,
        body: String::new(),
    };

    if page.is_html() {
        page.body = response.text().await?;
    }

    Ok(page)
}

fn header_value(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
