//! reqwest-backed transport
//!
//! Issues GET/POST requests with a flat parameter set and hands back the
//! final URL, status and body. Statuses are reported, never raised.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::transport::Transport;
use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::types::{HttpResponse, Method, QueryParams};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP client implementing [`Transport`]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config
            .requests_per_second
            .map(|rps| RateLimiter::new(&RateLimiterConfig::new(rps, rps)));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Check if throttling is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait(cancel).await?;
        }

        let mut req = self.client.request(method.into(), url);
        for (key, value) in &self.config.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        req = match method {
            Method::GET => req.query(params),
            Method::POST => req.form(params),
        };

        let timeout = self.config.timeout();
        let round_trip = async {
            let response = req.send().await?;
            let final_url = response.url().to_string();
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(HttpResponse {
                url: final_url,
                status,
                body,
            })
        };

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            result = round_trip => result.map_err(|e| classify(e, timeout))?,
        };

        debug!(
            "{:?} {} -> {} ({} bytes)",
            method,
            url,
            response.status,
            response.body.len()
        );
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get(
        &self,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.execute(Method::GET, url, params, cancel).await
    }

    async fn post(
        &self,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.execute(Method::POST, url, params, cancel).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Map reqwest's own timeout to our Timeout; everything else is verbatim
fn classify(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::timeout(timeout)
    } else {
        Error::Transport(err)
    }
}
