use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::Rng;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use thiserror::Error;
use tracing::{debug, warn};

use crate::markdown::strip_images;

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Courtesy delay between outbound requests, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let min = Duration::from_secs_f64(min_secs.max(0.0));
        let max = Duration::from_secs_f64(max_secs.max(0.0)).max(min);
        Pacing { min, max }
    }

    pub fn none() -> Self {
        Pacing { min: Duration::ZERO, max: Duration::ZERO }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            debug!("Waiting {:.1}s before next request", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Spider scrape timed out after {0:?}")]
    Timeout(Duration),
    #[error("Spider scrape failed: {message}")]
    Request { status: Option<u16>, message: String },
    #[error("Spider returned status {0}")]
    Status(u16),
    #[error("No content in spider response")]
    NoContent,
}

impl FetchError {
    /// HTTP status behind the failure, whether from the transport or the response body.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Request { status, .. } => *status,
            FetchError::Status(code) => Some(*code),
            FetchError::Timeout(_) | FetchError::NoContent => None,
        }
    }

    /// Rate limits and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status(), Some(429 | 500..=599))
    }
}

/// Markdown fetcher backed by spider.cloud.
pub struct PageFetcher {
    spider: Spider,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        let spider = Spider::new(Some(api_key.to_string()))
            .map_err(|e| anyhow!("Failed to create Spider client: {}", e))?;
        Ok(PageFetcher { spider, timeout })
    }

    /// Fetch `url` as markdown, backing off on rate limits and 5xx responses.
    pub async fn fetch_markdown(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(md) => return Ok(md),
                Err(e) if attempt < MAX_RETRIES && e.is_retryable() => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "{} on {} (attempt {}/{}), backing off {:.1}s",
                        e,
                        url,
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.spider.scrape_url(url, Some(params), "application/json"),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.timeout))?
        .map_err(|e| FetchError::Request {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

        parse_spider_response(response)
    }
}

/// Pull the markdown `content` out of a spider.cloud scrape response.
fn parse_spider_response(response: serde_json::Value) -> Result<String, FetchError> {
    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };

    let first = parsed.as_array().and_then(|arr| arr.first());

    if let Some(status) = first
        .and_then(|obj| obj.get("status"))
        .and_then(|s| s.as_u64())
        .filter(|s| *s >= 400)
    {
        return Err(FetchError::Status(u16::try_from(status).unwrap_or(u16::MAX)));
    }

    first
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(strip_images)
        .ok_or(FetchError::NoContent)
}
