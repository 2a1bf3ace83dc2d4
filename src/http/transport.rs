//! Transport seam
//!
//! Anything that can issue GET/POST with a flat parameter set and report the
//! final URL, status and body can drive the query engine and discovery.

use crate::error::Result;
use crate::types::{HttpResponse, Method, QueryParams};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Request/response collaborator used by the core
///
/// Implementations must not treat non-2xx statuses as errors; callers
/// interpret the status themselves. Cancellation of `cancel` must abort an
/// in-flight request and yield [`Error::Cancelled`](crate::Error::Cancelled).
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with `params` appended to the query string
    async fn get(
        &self,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse>;

    /// POST `params` as a form body to `url`
    async fn post(
        &self,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse>;

    /// Dispatch on `method`
    async fn send(
        &self,
        method: Method,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        match method {
            Method::GET => self.get(url, params, cancel).await,
            Method::POST => self.post(url, params, cancel).await,
        }
    }
}
