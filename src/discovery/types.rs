//! Discovery types and pure helpers

use crate::error::{Error, Result};
use regex::Regex;
use serde::de::IgnoredAny;
use std::sync::LazyLock;

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("scheme pattern"));

static RSD_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*["']([^"'?]+)\?action=rsd\b"#).expect("rsd pattern")
});

/// Result of probing one candidate URL
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProbeOutcome {
    #[default]
    Untested,
    /// Serves the JSON API; holds the confirmed URL without query string
    Confirmed(String),
    Rejected,
}

/// A URL tried during one discovery call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub url: String,
    pub outcome: ProbeOutcome,
}

impl EndpointCandidate {
    /// Untested candidate
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: ProbeOutcome::Untested,
        }
    }

    /// True if confirmed
    pub fn is_confirmed(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Confirmed(_))
    }
}

/// Outcome of a discovery call with every candidate tried
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveryReport {
    /// Confirmed endpoint, if any
    pub endpoint: Option<String>,
    /// Candidates in the order they were probed
    pub candidates: Vec<EndpointCandidate>,
}

/// Trim the expression and make sure it carries a scheme
///
/// `//host/path` becomes `http://host/path`; `host/path` becomes
/// `http://host/path`. Blank input is rejected.
pub fn normalize_expression(expression: &str) -> Result<String> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_expression("expression is empty"));
    }
    if trimmed.starts_with("//") {
        return Ok(format!("http:{trimmed}"));
    }
    if SCHEME.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{trimmed}"))
    }
}

/// True if `body` looks like a JSON API response
pub fn is_api_body(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.len() >= 2
        && (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<IgnoredAny>(trimmed).is_ok()
}

/// Base path of the first `?action=rsd` link reference in an HTML document
pub fn extract_rsd_base(html: &str) -> Option<&str> {
    RSD_LINK
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|base| !base.is_empty())
}

/// URL without its query string or fragment
pub fn strip_query(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}
