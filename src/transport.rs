//! Transport abstraction
//!
//! The core never talks HTTP directly. Every remote round-trip goes through
//! [`Transport::call`], so the pagination driver and the batch executor can be
//! driven by the real [`HttpClient`](crate::http::HttpClient) or by an
//! in-memory implementation in tests.

use crate::error::Result;
use crate::types::{JsonValue, Params};
use async_trait::async_trait;
use std::sync::Arc;

/// Kind of remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Side-effect free request (sent as GET)
    Read,
    /// State-changing request (sent as POST form)
    Write,
}

impl Endpoint {
    /// Whether this endpoint changes remote state
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }
}

/// A remote API that answers one request with one JSON document
///
/// Implementations surface network, HTTP and API-level failures as errors for
/// which [`Error::is_transport`](crate::Error::is_transport) holds. Retries,
/// if any, belong to the implementation; callers only see success or failure.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one round-trip
    async fn call(&self, endpoint: Endpoint, params: &Params) -> Result<JsonValue>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(&self, endpoint: Endpoint, params: &Params) -> Result<JsonValue> {
        (**self).call(endpoint, params).await
    }
}

/// Build a parameter map from literal pairs
pub fn params<const N: usize>(pairs: [(&str, &str); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
