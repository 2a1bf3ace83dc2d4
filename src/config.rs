//! Configuration types
//!
//! A site is described by the expression handed to endpoint discovery plus
//! HTTP and query settings. Configs load from YAML or are built in code.

use crate::error::{Error, Result};
use crate::types::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default key under which query results are returned
pub const DEFAULT_RESULT_KEY: &str = "query";

/// Default probe deadline for endpoint discovery
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Site Config
// ============================================================================

/// Complete site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// URL or bare host expression handed to endpoint discovery
    pub endpoint: String,

    /// Key under which paginated results are found
    #[serde(default = "default_result_key")]
    pub result_key: String,

    /// Deadline for each discovery probe, in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Method used for query requests
    #[serde(default)]
    pub method: Method,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_result_key() -> String {
    DEFAULT_RESULT_KEY.to_string()
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

impl SiteConfig {
    /// Create a config for an endpoint expression with defaults
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            result_key: default_result_key(),
            probe_timeout_secs: default_probe_timeout_secs(),
            method: Method::default(),
            http: HttpConfig::default(),
        }
    }

    /// Parse from a YAML string and validate
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Check required fields and ranges
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::config("endpoint must not be empty"));
        }
        if self.result_key.is_empty() {
            return Err(Error::config("result_key must not be empty"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::config("probe_timeout_secs must be greater than 0"));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::config("http.timeout_secs must be greater than 0"));
        }
        if self.http.requests_per_second == Some(0) {
            return Err(Error::config("http.requests_per_second must be greater than 0"));
        }
        Ok(())
    }

    /// Probe deadline as a duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Set the endpoint expression
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the result key
    #[must_use]
    pub fn with_result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = key.into();
        self
    }

    /// Set the query method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the HTTP settings
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional request throttle
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("wikiclient/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            requests_per_second: None,
            headers: HashMap::new(),
        }
    }
}

impl HttpConfig {
    /// Create a new config builder
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder for HTTP config
#[derive(Default)]
pub struct HttpConfigBuilder {
    config: HttpConfig,
}

impl HttpConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Throttle to this many requests per second
    pub fn requests_per_second(mut self, rps: u32) -> Self {
        self.config.requests_per_second = Some(rps);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Build the config
    pub fn build(self) -> HttpConfig {
        self.config
    }
}
