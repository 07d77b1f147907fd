//! Polite page fetcher: one rate-limited client shared by all scrape tasks,
//! with bounded retries for transient failures.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::core::config::settings::ScrapeSettings;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url} failed: {message}")]
    Network { url: String, message: String },
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

/// Seam for the ingest pipeline; the HTTP implementation is `PageFetcher`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

pub struct PageFetcher {
    client: reqwest::Client,
    limiter: Option<DefaultDirectRateLimiter>,
    max_retries: usize,
}

impl PageFetcher {
    pub fn new(settings: &ScrapeSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::limited(5))
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build scrape HTTP client")?;

        let limiter = Quota::with_period(settings.min_request_interval()).map(RateLimiter::direct);

        Ok(Self {
            client,
            limiter,
            max_retries: settings.max_retries,
        })
    }

    /// Fetches one page, waiting on the shared rate limiter before each
    /// attempt. Timeouts, connection failures, 429 and 5xx responses are
    /// retried with exponential backoff; other failures surface immediately.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|err| FetchError::Network {
            url: url.to_string(),
            message: format!("invalid URL: {}", err),
        })?;

        let mut attempt = 0usize;
        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            match self.client.get(parsed.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        if response.url().as_str() != parsed.as_str() {
                            debug!(url, final_url = %response.url(), "request was redirected");
                        }
                        match response.text().await {
                            Ok(html) => {
                                debug!(url, bytes = html.len(), "page fetched");
                                return Ok(FetchedPage {
                                    url: url.to_string(),
                                    html,
                                });
                            }
                            Err(err) => {
                                if is_retryable_error(&err) && attempt < self.max_retries {
                                    warn!(url, attempt, error = %err, "body read failed, retrying");
                                    tokio::time::sleep(retry_backoff(attempt)).await;
                                    attempt += 1;
                                    continue;
                                }
                                return Err(FetchError::Network {
                                    url: url.to_string(),
                                    message: err.to_string(),
                                });
                            }
                        }
                    }

                    if should_retry_status(status) && attempt < self.max_retries {
                        warn!(url, attempt, status = status.as_u16(), "retryable status, backing off");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt < self.max_retries {
                        warn!(url, attempt, error = %err, "request failed, retrying");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        PageFetcher::fetch(self, url).await
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let base = 500u64 * (1 << attempt.min(5) as u32);
    let jitter = rand::rng().random_range(0..250u64);
    Duration::from_millis(base + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(should_retry_status(StatusCode::BAD_GATEWAY));
        assert!(!should_retry_status(StatusCode::NOT_FOUND));
        assert!(!should_retry_status(StatusCode::FORBIDDEN));
        assert!(!should_retry_status(StatusCode::OK));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert!(retry_backoff(0) >= Duration::from_millis(500));
        assert!(retry_backoff(0) < Duration::from_millis(750));
        assert!(retry_backoff(1) >= Duration::from_millis(1000));
        assert!(retry_backoff(3) >= Duration::from_millis(4000));
        assert!(retry_backoff(10) < Duration::from_millis(16_250));
    }

    #[tokio::test]
    async fn rejects_unparseable_urls() {
        let settings = ScrapeSettings {
            target_urls: vec![],
            concurrency: 1,
            max_retries: 0,
            request_timeout_secs: 5,
            min_request_interval_ms: 0,
        };
        let fetcher = PageFetcher::new(&settings).unwrap();

        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
