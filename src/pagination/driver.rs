//! Paginated sequence driver
//!
//! Turns a chain of continuation round-trips into one lazy, pull-based
//! sequence of raw items.

use super::types::{ContinuationCursor, CursorState};
use crate::error::{Error, Result};
use crate::generators::Generator;
use crate::transport::{Endpoint, Transport};
use crate::types::{Params, RawItem};
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One round-trip: items of the page at `cursor` and the cursor after it
///
/// The token in `cursor` is merged over `base` without being looked at.
pub async fn advance(
    transport: &dyn Transport,
    generator: &dyn Generator,
    base: &Params,
    cursor: &ContinuationCursor,
) -> Result<(Vec<RawItem>, ContinuationCursor)> {
    if cursor.is_exhausted() {
        return Err(Error::invalid_request(
            "cannot advance an exhausted cursor",
        ));
    }

    let mut params = base.clone();
    params.extend(cursor.params());

    let response = transport.call(Endpoint::Read, &params).await?;
    let items = generator.parse_page(&response)?;
    let next = ContinuationCursor::next_from(&response)?;
    Ok((items, next))
}

/// Lazy sequence over every page of one enumeration
///
/// Nothing is requested until the first pull, and a round-trip is only made
/// when the buffered items are used up. Dropping the driver stops the
/// enumeration; no request is issued once the cursor is exhausted.
///
/// A failed round-trip leaves the cursor where it was, so pulling again
/// retries the same page.
pub struct SequenceDriver {
    transport: Arc<dyn Transport>,
    generator: Arc<dyn Generator>,
    base: Params,
    cursor: ContinuationCursor,
    buffer: VecDeque<RawItem>,
    cancel: CancellationToken,
    round_trips: u64,
    yielded: u64,
}

impl SequenceDriver {
    /// Create a driver; fails before any round-trip if the request is invalid
    pub fn new(
        transport: Arc<dyn Transport>,
        generator: Arc<dyn Generator>,
        page_size: u32,
    ) -> Result<Self> {
        let base = generator.build_request(page_size.max(1))?;
        Ok(Self {
            transport,
            generator,
            base,
            cursor: ContinuationCursor::new(),
            buffer: VecDeque::new(),
            cancel: CancellationToken::new(),
            round_trips: 0,
            yielded: 0,
        })
    }

    /// Resume from a previously saved cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: ContinuationCursor) -> Self {
        self.cursor = cursor;
        self
    }

    /// Stop at the next round-trip once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cursor of the next round-trip
    pub fn cursor(&self) -> &ContinuationCursor {
        &self.cursor
    }

    /// Current state of the sequence
    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Round-trips issued so far
    pub fn round_trips(&self) -> u64 {
        self.round_trips
    }

    /// Items handed out so far
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Name of the underlying generator
    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    /// Next item, fetching pages as needed; `None` once exhausted
    pub async fn next(&mut self) -> Result<Option<RawItem>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(item));
            }
            // Pages may legitimately be empty while more remain
            if !self.fetch().await? {
                return Ok(None);
            }
        }
    }

    /// Rest of the current page, or the next page; `None` once exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawItem>>> {
        if self.buffer.is_empty() && !self.fetch().await? {
            return Ok(None);
        }
        let page: Vec<RawItem> = self.buffer.drain(..).collect();
        self.yielded += page.len() as u64;
        Ok(Some(page))
    }

    /// Drain every remaining item
    pub async fn collect(mut self) -> Result<Vec<RawItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Adapt into a [`Stream`]; the stream ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<RawItem>> + Send {
        stream::unfold(Some(self), |driver| async move {
            let mut driver = driver?;
            match driver.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(driver))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Issue one round-trip unless exhausted; returns whether one was made
    async fn fetch(&mut self) -> Result<bool> {
        if self.cursor.is_exhausted() {
            return Ok(false);
        }
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let round_trip = advance(
            self.transport.as_ref(),
            self.generator.as_ref(),
            &self.base,
            &self.cursor,
        );
        let (items, next) = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            result = round_trip => result?,
        };

        self.round_trips += 1;
        debug!(
            generator = self.generator.name(),
            round_trip = self.round_trips,
            items = items.len(),
            exhausted = next.is_exhausted(),
            "Fetched page"
        );

        self.buffer.extend(items);
        self.cursor = next;
        Ok(true)
    }
}

impl std::fmt::Debug for SequenceDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceDriver")
            .field("generator", &self.generator.name())
            .field("state", &self.cursor.state())
            .field("buffered", &self.buffer.len())
            .field("round_trips", &self.round_trips)
            .finish_non_exhaustive()
    }
}
