//! Request dispatch for the crawl
//!
//! Every catalog page, lyrics search and lyrics page goes through
//! [`CrawlEngine::fetch`], which applies the global concurrency ceiling,
//! the inter-request delay, transport retries and cancellation. The raw
//! HTTP exchange sits behind [`HttpFetcher`] so it can be swapped out.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CrawlError, NetworkError, Result};
use crate::signal_handler::ShutdownSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_form(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            CrawlError::invalid_response(format!("{} returned malformed JSON: {}", self.url, e))
        })
    }
}

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production fetcher backed by reqwest
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("trackcrawl-cli v{}", version))
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;

        Ok(HttpResponse { status, url, body })
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_concurrent_requests: usize,
    pub request_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8,
            request_delay: Duration::from_millis(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(300),
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent_requests: config.max_concurrent_requests,
            request_delay: Duration::from_millis(config.request_delay_ms),
            max_retries: config.max_retries,
            ..Self::default()
        }
    }
}

pub struct CrawlEngine {
    fetcher: Arc<dyn HttpFetcher>,
    permits: Semaphore,
    settings: EngineSettings,
    shutdown: ShutdownSignal,
    dispatched: AtomicUsize,
}

impl CrawlEngine {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        settings: EngineSettings,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            fetcher,
            permits: Semaphore::new(settings.max_concurrent_requests.max(1)),
            settings,
            shutdown,
            dispatched: AtomicUsize::new(0),
        }
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Total requests handed to the fetcher, retries included
    pub fn dispatched_requests(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Dispatch a request, retrying transport failures, 429 and 5xx.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let max_attempts = self.settings.max_retries.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            if self.shutdown.is_shutdown_requested() {
                return Err(CrawlError::Cancelled);
            }

            let result = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| CrawlError::Cancelled)?;

                if !self.settings.request_delay.is_zero() {
                    tokio::time::sleep(self.settings.request_delay).await;
                }

                self.dispatched.fetch_add(1, Ordering::Relaxed);
                debug!("Dispatching {:?} {} (attempt {})", request.method, request.url, attempt);
                self.fetcher.execute(request.clone()).await
            };

            if self.shutdown.is_shutdown_requested() {
                debug!("Discarding response for {} after shutdown", request.url);
                return Err(CrawlError::Cancelled);
            }

            match result {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let retryable = response.status == 429 || response.status >= 500;
                    if retryable && attempt < max_attempts {
                        warn!("{} returned {}, retrying", request.url, response.status);
                        self.backoff(attempt).await;
                        continue;
                    }
                    return Err(NetworkError::Status {
                        status: response.status,
                        url: request.url,
                    }
                    .into());
                }
                Err(CrawlError::Network(e)) if attempt < max_attempts => {
                    warn!("Request to {} failed: {}, retrying", request.url, e);
                    self.backoff(attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn backoff(&self, attempt: u32) {
        let delay = self.settings.retry_backoff * 2u32.pow(attempt - 1);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
