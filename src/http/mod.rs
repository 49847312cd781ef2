//! HTTP transport module
//!
//! Provides the concrete [`Transport`](crate::transport::Transport) used
//! against a MediaWiki `api.php` endpoint.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **API Envelope Handling**: `error` objects become [`Error::Api`](crate::Error::Api),
//!   `warnings` are logged

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
