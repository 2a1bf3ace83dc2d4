//! In-memory transport that replays scripted responses and records requests

use crate::error::{Error, Result};
use crate::http::Transport;
use crate::types::{HttpResponse, Method, QueryParams};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One recorded request
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub params: QueryParams,
}

#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response with a JSON body
    pub fn push_json(&self, body: Value) -> &Self {
        self.push(Ok(HttpResponse::new("http://scripted/api.php", 200, body.to_string())))
    }

    /// Queue a raw response or error
    pub fn push(&self, response: Result<HttpResponse>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(
        &self,
        method: Method,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_string(),
            params: params.clone(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("script exhausted".to_string())))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.next(Method::GET, url, params, cancel)
    }

    async fn post(
        &self,
        url: &str,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        self.next(Method::POST, url, params, cancel)
    }
}
