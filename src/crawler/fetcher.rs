//! HTTP fetching
//!
//! One rate-limited GET per URL, single attempt. Network failures and
//! non-2xx statuses are captured as data in the [`FetchResult`] rather than
//! returned as errors, so a bad response never interrupts a worker loop.
//! Retry policy is deliberately absent; it would be an explicit extension.

use crate::crawler::rate::RateLimiter;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

/// Request timeout applied by the shared client
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Responses larger than this are rejected rather than stored
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Outcome of one fetch, consumed once by the worker and then discarded
#[derive(Debug)]
pub struct FetchResult {
    /// The canonical URL that was requested
    pub url: Url,
    /// HTTP status code, if a response arrived
    pub status: Option<u16>,
    /// Media type portion of the Content-Type header, lowercased
    pub content_type: Option<String>,
    /// Response body (empty on failure)
    pub bytes: Vec<u8>,
    pub elapsed_ms: u64,
    /// Set for network failures, timeouts, oversized bodies and non-2xx
    /// statuses; `None` means the body is usable
    pub error: Option<String>,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn failed(url: Url, status: Option<u16>, elapsed_ms: u64, error: String) -> Self {
        Self {
            url,
            status,
            content_type: None,
            bytes: Vec::new(),
            elapsed_ms,
            error: Some(error),
        }
    }
}

/// Builds the shared HTTP client
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one URL through the shared client, rate limited
///
/// Acquires a rate token before issuing the request so the aggregate
/// request rate stays bounded no matter how many workers call this.
pub async fn fetch_url(client: &Client, limiter: &RateLimiter, url: &Url) -> FetchResult {
    limiter.acquire().await;

    let start = Instant::now();
    let response = match client.get(url.clone()).send().await {
        Ok(r) => r,
        Err(e) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            return FetchResult::failed(url.clone(), None, elapsed_ms, message);
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase()
        });

    let bytes = match response.bytes().await {
        Ok(b) => b.to_vec(),
        Err(e) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            return FetchResult::failed(
                url.clone(),
                Some(status.as_u16()),
                elapsed_ms,
                format!("failed to read body: {}", e),
            );
        }
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let error = if !status.is_success() {
        Some(format!("HTTP {}", status.as_u16()))
    } else if bytes.len() > MAX_BODY_BYTES {
        Some(format!("response too large ({} bytes)", bytes.len()))
    } else {
        None
    };

    FetchResult {
        url: url.clone(),
        status: Some(status.as_u16()),
        content_type,
        bytes,
        elapsed_ms,
        error,
    }
}
