//! Tests for pagination module

use super::*;
use crate::error::{Error, Result};
use crate::generators::{AllPages, Generator, Search};
use crate::testing::{allpages_response, ScriptedTransport};
use crate::transport::{Endpoint, Transport};
use crate::types::{JsonValue, Params};
use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn driver(transport: Arc<ScriptedTransport>, page_size: u32) -> SequenceDriver {
    SequenceDriver::new(transport, Arc::new(AllPages::new(0)), page_size).unwrap()
}

fn ids(items: &[crate::types::RawItem]) -> Vec<i64> {
    items
        .iter()
        .filter_map(|i| i.get("pageid").and_then(JsonValue::as_i64))
        .collect()
}

// ============================================================================
// ContinuationCursor Tests
// ============================================================================

#[test]
fn test_cursor_starts_not_started() {
    let cursor = ContinuationCursor::new();
    assert_eq!(cursor.state(), CursorState::NotStarted);
    assert!(cursor.params().is_empty());
}

#[test]
fn test_cursor_from_response_with_continue() {
    let response = json!({"continue": {"gsroffset": 20, "continue": "gsroffset||"}});
    let cursor = ContinuationCursor::next_from(&response).unwrap();

    assert_eq!(cursor.state(), CursorState::InProgress);
    let params = cursor.params();
    assert_eq!(params["gsroffset"], "20");
    assert_eq!(params["continue"], "gsroffset||");
}

#[test]
fn test_cursor_from_final_response() {
    let cursor = ContinuationCursor::next_from(&json!({"batchcomplete": true})).unwrap();
    assert_eq!(cursor.state(), CursorState::Exhausted);

    let empty = ContinuationCursor::next_from(&json!({"continue": {}})).unwrap();
    assert!(empty.is_exhausted());
}

#[test]
fn test_cursor_rejects_non_object_token() {
    let result = ContinuationCursor::next_from(&json!({"continue": "abc"}));
    assert!(matches!(result, Err(Error::Decode { .. })));
}

#[test]
fn test_cursor_serde_roundtrip_for_resume() {
    let cursor = ContinuationCursor::next_from(&json!({"continue": {"rvcontinue": "2017|99"}}))
        .unwrap();
    let saved = serde_json::to_string(&cursor).unwrap();
    let restored: ContinuationCursor = serde_json::from_str(&saved).unwrap();
    assert_eq!(restored, cursor);
}

// ============================================================================
// advance Tests
// ============================================================================

#[tokio::test]
async fn test_advance_threads_token_verbatim() {
    let transport = ScriptedTransport::paged(30);
    let generator = AllPages::new(0);
    let base = generator.build_request(10).unwrap();

    let (first, cursor) = advance(transport.as_ref(), &generator, &base, &ContinuationCursor::new())
        .await
        .unwrap();
    let (second, _) = advance(transport.as_ref(), &generator, &base, &cursor)
        .await
        .unwrap();

    assert_eq!(ids(&first), (1..=10).collect::<Vec<_>>());
    assert_eq!(ids(&second), (11..=20).collect::<Vec<_>>());

    let requests = transport.requests();
    assert!(!requests[0].1.contains_key("gapcontinue"));
    assert_eq!(requests[1].1["gapcontinue"], "10");
    assert_eq!(requests[1].1["continue"], "gapcontinue||");
    assert_eq!(requests[1].0, Endpoint::Read);
}

#[tokio::test]
async fn test_advance_refuses_exhausted_cursor() {
    let transport = ScriptedTransport::paged(3);
    let generator = AllPages::new(0);
    let base = generator.build_request(10).unwrap();

    let result = advance(
        transport.as_ref(),
        &generator,
        &base,
        &ContinuationCursor::exhausted(),
    )
    .await;

    assert!(matches!(result, Err(Error::InvalidRequest { .. })));
    assert_eq!(transport.calls(), 0);
}

// ============================================================================
// SequenceDriver Tests
// ============================================================================

#[tokio::test]
async fn test_driver_yields_every_item_once() {
    let transport = ScriptedTransport::paged(23);
    let items = driver(Arc::clone(&transport), 5).collect().await.unwrap();

    let ids = ids(&items);
    assert_eq!(ids.len(), 23);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 23);
    assert_eq!(ids, (1..=23).collect::<Vec<_>>());
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn test_driver_no_round_trip_after_exhaustion() {
    let transport = ScriptedTransport::paged(10);
    let mut driver = driver(Arc::clone(&transport), 5);

    while driver.next().await.unwrap().is_some() {}
    assert_eq!(driver.state(), CursorState::Exhausted);
    assert_eq!(transport.calls(), 2);

    assert!(driver.next().await.unwrap().is_none());
    assert!(driver.next_page().await.unwrap().is_none());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_driver_is_lazy() {
    let transport = ScriptedTransport::paged(100);
    let mut driver = driver(Arc::clone(&transport), 10);
    assert_eq!(transport.calls(), 0);
    assert_eq!(driver.state(), CursorState::NotStarted);

    for _ in 0..3 {
        driver.next().await.unwrap();
    }
    assert_eq!(transport.calls(), 1);
    assert_eq!(driver.yielded(), 3);
}

#[tokio::test]
async fn test_driver_take_n_stops_requesting() {
    let transport = ScriptedTransport::paged(1000);
    let taken: Vec<_> = driver(Arc::clone(&transport), 5)
        .into_stream()
        .take(7)
        .collect()
        .await;

    assert_eq!(taken.len(), 7);
    assert!(taken.iter().all(Result::is_ok));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_driver_copes_with_oversized_pages() {
    // Remote ignores the page size hint and returns 8 items per page
    let transport = ScriptedTransport::new(|_, params| {
        let mut params = params.clone();
        params.insert("gaplimit".into(), "8".into());
        Ok(allpages_response(20, &params))
    });
    let items = driver(Arc::clone(&transport), 3).collect().await.unwrap();
    assert_eq!(ids(&items), (1..=20).collect::<Vec<_>>());
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_driver_skips_empty_intermediate_pages() {
    let transport = ScriptedTransport::new(|_, params| {
        Ok(match params.get("step").map(String::as_str) {
            None => json!({"continue": {"step": "1"}}),
            Some("1") => json!({"query": {"pages": []}, "continue": {"step": "2"}}),
            _ => json!({"query": {"pages": [{"pageid": 5, "title": "Five"}]}}),
        })
    });
    let mut driver = driver(Arc::clone(&transport), 5);

    let item = driver.next().await.unwrap().unwrap();
    assert_eq!(item["pageid"], 5);
    assert!(driver.next().await.unwrap().is_none());
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_driver_next_page_returns_pages() {
    let transport = ScriptedTransport::paged(7);
    let mut driver = driver(Arc::clone(&transport), 4);

    let first = driver.next_page().await.unwrap().unwrap();
    let second = driver.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 4);
    assert_eq!(second.len(), 3);
    assert!(driver.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_driver_failure_is_not_exhaustion() {
    let transport = ScriptedTransport::new(|_, params| {
        if params.contains_key("gapcontinue") {
            Err(Error::http_status(503, "unavailable"))
        } else {
            Ok(allpages_response(10, params))
        }
    });
    let mut driver = driver(Arc::clone(&transport), 5);

    for _ in 0..5 {
        assert!(driver.next().await.unwrap().is_some());
    }
    let err = driver.next().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(driver.state(), CursorState::InProgress);
}

#[tokio::test]
async fn test_driver_retry_after_failure_resumes_same_page() {
    let failures = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&failures);
    let transport = ScriptedTransport::new(move |_, params| {
        if params.contains_key("gapcontinue")
            && counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0
        {
            return Err(Error::Timeout { timeout_ms: 10 });
        }
        Ok(allpages_response(10, params))
    });
    let mut driver = driver(Arc::clone(&transport), 5);

    let mut seen = Vec::new();
    loop {
        match driver.next().await {
            Ok(Some(item)) => seen.push(item),
            Ok(None) => break,
            Err(Error::Timeout { .. }) => continue,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ids(&seen), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_driver_stream_ends_after_error() {
    let transport = ScriptedTransport::new(|_, _| Err(Error::http_status(500, "boom")));
    let results: Vec<_> = driver(transport, 5).into_stream().collect().await;
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[tokio::test]
async fn test_driver_invalid_request_fails_before_round_trip() {
    let transport = ScriptedTransport::paged(10);
    let result = SequenceDriver::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::new(Search::new("")),
        10,
    );
    assert!(matches!(result, Err(Error::InvalidRequest { .. })));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_driver_resumes_from_saved_cursor() {
    let transport = ScriptedTransport::paged(12);
    let mut first = driver(Arc::clone(&transport), 5);
    first.next_page().await.unwrap();
    let saved = first.cursor().clone();
    drop(first);

    let rest = driver(Arc::clone(&transport), 5)
        .with_cursor(saved)
        .collect()
        .await
        .unwrap();
    assert_eq!(ids(&rest), (6..=12).collect::<Vec<_>>());
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[tokio::test]
async fn test_cancelled_driver_issues_no_round_trip() {
    let transport = ScriptedTransport::paged(100);
    let token = CancellationToken::new();
    let mut driver = driver(Arc::clone(&transport), 10).with_cancellation(token.clone());

    driver.next().await.unwrap();
    token.cancel();

    // Buffered items are still handed out
    for _ in 0..9 {
        assert!(driver.next().await.unwrap().is_some());
    }
    assert!(matches!(driver.next().await, Err(Error::Cancelled)));
    assert_eq!(transport.calls(), 1);
}

/// Transport whose calls never complete
struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn call(&self, _endpoint: Endpoint, _params: &Params) -> Result<JsonValue> {
        futures::future::pending().await
    }
}

#[tokio::test]
async fn test_cancellation_interrupts_in_flight_round_trip() {
    let token = CancellationToken::new();
    let mut driver = SequenceDriver::new(Arc::new(StalledTransport), Arc::new(AllPages::new(0)), 5)
        .unwrap()
        .with_cancellation(token.clone());

    let handle = tokio::spawn(async move { driver.next().await });
    tokio::task::yield_now().await;
    token.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
}
