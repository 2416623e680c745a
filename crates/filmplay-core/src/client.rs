//! HTTP client with retry logic for analyzer and media probing requests
//!
//! Wraps `reqwest` with a shared timeout and exponential backoff for
//! transient errors.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FilmError, Result};

/// Configuration for the HTTP client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient errors (default: 3)
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client wrapper with retry logic
///
/// Handles all HTTP communication owned by this crate:
/// - JSON analyzer and `playUrl` template requests
/// - Content-Type probing for media classification
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(FilmError::HttpError)?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
        })
    }

    /// Fetch a URL and parse its body as JSON
    ///
    /// # Errors
    /// - `HttpError` - Network or HTTP errors
    /// - `RateLimited` - Server returned 429 after all retries exhausted
    /// - `JsonError` - Body is not valid JSON
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        let body = self.fetch_with_retry(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Probe a URL for its `Content-Type` header
    ///
    /// Issues a HEAD request first and falls back to GET when the server
    /// rejects HEAD. The body of the GET response is never read.
    pub async fn content_type(&self, url: &str) -> Result<Option<String>> {
        let response = match self.client.head(url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!(status = %resp.status(), url, "HEAD rejected, retrying with GET");
                self.client.get(url).send().await?
            }
            Err(e) if e.is_timeout() || e.is_connect() => return Err(e.into()),
            Err(_) => self.client.get(url).send().await?,
        };

        let response = response.error_for_status()?;
        Ok(response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase()))
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_error: Option<FilmError> = None;
        let mut attempt = 0;

        while attempt <= self.max_retries {
            match self.do_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if Self::is_retryable(&e) && attempt < self.max_retries {
                        // Exponential backoff: 1s, 2s, 4s
                        let backoff = Duration::from_secs(1 << attempt);
                        warn!(url, attempt, error = %e, "request failed, backing off");
                        tokio::time::sleep(backoff).await;
                        last_error = Some(e);
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(FilmError::RateLimited))
    }

    async fn do_fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FilmError::RateLimited);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FilmError::NotFound(url.to_string()));
        }

        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }

    fn is_retryable(error: &FilmError) -> bool {
        match error {
            FilmError::RateLimited => true,
            FilmError::HttpError(e) => {
                // Retry on timeout, connection errors, or 5xx status codes
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }
}
