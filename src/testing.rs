//! In-memory transports for unit tests

use crate::error::Result;
use crate::transport::{Endpoint, Transport};
use crate::types::{JsonValue, Params};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Handler = dyn Fn(Endpoint, &Params) -> Result<JsonValue> + Send + Sync;

/// Transport answering from a closure and recording every request
pub(crate) struct ScriptedTransport {
    handler: Box<Handler>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Endpoint, Params)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(Endpoint, &Params) -> Result<JsonValue> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Serves `total` pages of `allpages` results, honouring `gaplimit`
    pub(crate) fn paged(total: usize) -> Arc<Self> {
        Self::new(move |_, params| Ok(allpages_response(total, params)))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<(Endpoint, Params)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, endpoint: Endpoint, params: &Params) -> Result<JsonValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((endpoint, params.clone()));
        (self.handler)(endpoint, params)
    }
}

/// One page of a simulated `generator=allpages` enumeration over `total` pages
///
/// Page `i` has id `i + 1` and title `Page i`; the continuation token is the
/// offset of the next page.
pub(crate) fn allpages_response(total: usize, params: &Params) -> JsonValue {
    let offset: usize = params
        .get("gapcontinue")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let limit: usize = params
        .get("gaplimit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let end = (offset + limit).min(total);

    let pages: Vec<JsonValue> = (offset..end)
        .map(|i| json!({"pageid": i + 1, "ns": 0, "title": format!("Page {i}")}))
        .collect();

    let mut response = json!({"batchcomplete": true, "query": {"pages": pages}});
    if end < total {
        response["continue"] = json!({"gapcontinue": end.to_string(), "continue": "gapcontinue||"});
    }
    response
}
