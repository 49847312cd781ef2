//! Session configuration
//!
//! [`SessionConfig`] is read from YAML or JSON; every field has a default so a
//! file only needs to name what it changes.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest page size the remote accepts from any account
pub const MAX_PAGE_SIZE: u32 = 5000;

// ============================================================================
// Session Config
// ============================================================================

/// Configuration of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// URL of the `api.php` endpoint
    #[serde(default)]
    pub api_url: String,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Items requested per round-trip (a hint, clamped to 1..=5000)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Items per batch call
    #[serde(default = "default_batch_chunk_size")]
    pub batch_chunk_size: usize,

    /// Batch chunks in flight at once
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Redirects followed before giving up
    #[serde(default = "default_max_redirect_steps")]
    pub max_redirect_steps: usize,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            user_agent: None,
            page_size: default_page_size(),
            batch_chunk_size: default_batch_chunk_size(),
            batch_concurrency: default_batch_concurrency(),
            max_redirect_steps: default_max_redirect_steps(),
            http: HttpSettings::default(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}

fn default_batch_chunk_size() -> usize {
    50
}

fn default_batch_concurrency() -> usize {
    1
}

fn default_max_redirect_steps() -> usize {
    20
}

impl SessionConfig {
    /// Config pointing at `api_url` with every other field defaulted
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.batch_chunk_size == 0 {
            return Err(Error::config("batch_chunk_size must be at least 1"));
        }
        if self.batch_concurrency == 0 {
            return Err(Error::config("batch_concurrency must be at least 1"));
        }
        if self.max_redirect_steps == 0 {
            return Err(Error::config("max_redirect_steps must be at least 1"));
        }
        if !self.api_url.is_empty() {
            url::Url::parse(&self.api_url)
                .map_err(|e| Error::config(format!("invalid api_url '{}': {e}", self.api_url)))?;
        }
        if self.http.requests_per_second == Some(0) {
            return Err(Error::config("requests_per_second must be at least 1"));
        }
        Ok(())
    }

    /// Page size actually sent
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// HTTP client configuration derived from this config
    pub fn http_client_config(&self) -> HttpClientConfig {
        let http = &self.http;
        let mut builder = HttpClientConfig::builder()
            .api_url(self.api_url.clone())
            .timeout(Duration::from_secs(http.timeout_secs))
            .max_retries(http.max_retries)
            .backoff(
                http.backoff,
                Duration::from_millis(http.initial_backoff_ms),
                Duration::from_millis(http.max_backoff_ms),
            );
        builder = match http.requests_per_second {
            Some(rps) => builder.rate_limit(RateLimiterConfig::new(
                rps,
                http.burst_size.unwrap_or(rps),
            )),
            None => builder.no_rate_limit(),
        };
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// Retry, timeout and rate limit settings of the HTTP transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Backoff growth
    #[serde(default)]
    pub backoff: BackoffType,

    /// Requests per second; no rate limiting when absent
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Burst allowance; defaults to `requests_per_second`
    #[serde(default)]
    pub burst_size: Option<u32>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff: BackoffType::default(),
            requests_per_second: None,
            burst_size: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    60000
}
