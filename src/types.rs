//! Common types used throughout wikiclient
//!
//! Shared type aliases and the raw HTTP response shape handed back by
//! every [`Transport`](crate::http::Transport).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Flat request parameter set. Ordered so requests are reproducible.
pub type QueryParams = BTreeMap<String, String>;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method used for API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

/// Raw response from a transport round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Body text
    pub body: String,
}

impl HttpResponse {
    /// Create a response
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Build a [`QueryParams`] from string pairs
pub fn params<K, V, I>(pairs: I) -> QueryParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serde() {
        let method: Method = serde_json::from_str("\"POST\"").unwrap();
        assert_eq!(method, Method::POST);
        assert_eq!(Method::default(), Method::GET);
        assert_eq!(reqwest::Method::from(Method::POST), reqwest::Method::POST);
    }

    #[test]
    fn test_response_status_classes() {
        assert!(HttpResponse::new("u", 200, "").is_success());
        assert!(HttpResponse::new("u", 404, "").is_client_error());
        assert!(!HttpResponse::new("u", 503, "").is_success());
        assert!(!HttpResponse::new("u", 503, "").is_client_error());
    }

    #[test]
    fn test_params_builder() {
        let p = params([("action", "query"), ("list", "allpages")]);
        assert_eq!(p.get("action").map(String::as_str), Some("query"));
        assert_eq!(p.len(), 2);
    }
}
