//! Error types for wikiclient
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Discovery reports "no endpoint found" as `Ok(None)`, not as an error.

use std::sync::Arc;
use thiserror::Error;

/// The main error type for wikiclient
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Response Errors
    // ============================================================================
    #[error("Malformed response: {message}")]
    MalformedResponse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("API error [{code}]: {info}")]
    Api { code: String, info: String },

    // ============================================================================
    // Discovery / Enumeration Errors
    // ============================================================================
    #[error("Invalid endpoint expression: {message}")]
    InvalidExpression { message: String },

    #[error("No API endpoint found for '{expression}'")]
    EndpointNotFound { expression: String },

    #[error("Enumeration already faulted; no further pages")]
    EnumerationFinished,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Failure observed through a single-flight initializer; every waiter
    /// receives the same `Arc`.
    #[error(transparent)]
    Shared(Arc<Error>),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a malformed response error for a body that is not JSON
    pub fn invalid_json(url: &str, source: serde_json::Error) -> Self {
        Self::MalformedResponse {
            message: format!("invalid JSON from {url}"),
            source: Some(source),
        }
    }

    /// Create an API error from a server error envelope
    pub fn api(code: impl Into<String>, info: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            info: info.into(),
        }
    }

    /// Create an invalid expression error
    pub fn invalid_expression(message: impl Into<String>) -> Self {
        Self::InvalidExpression {
            message: message.into(),
        }
    }

    /// Create a timeout error from a duration
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: after.as_millis() as u64,
        }
    }

    /// The underlying error, looking through `Shared` wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// True if this error (or the shared error it wraps) is a caller cancellation
    pub fn is_cancellation(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Shared(inner) => inner.is_cancellation(),
            _ => false,
        }
    }

    /// True if this error (or the shared error it wraps) is an internal deadline
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::Transport(e) => e.is_timeout(),
            Error::Shared(inner) => inner.is_timeout(),
            _ => false,
        }
    }
}

impl From<Arc<Error>> for Error {
    fn from(err: Arc<Error>) -> Self {
        Error::Shared(err)
    }
}

/// Result type alias for wikiclient
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
