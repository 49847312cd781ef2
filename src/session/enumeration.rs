//! Enumerations bound to a session's registry

use super::types::SessionStats;
use crate::batch::FetchedRevision;
use crate::entity::{FieldMapping, Page, PageFragment, Registry};
use crate::error::Result;
use crate::pagination::{ContinuationCursor, CursorState, SequenceDriver};
use futures::stream::{self, Stream};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Lazy sequence of canonical pages
///
/// Each raw item is merged into the session registry before it is yielded,
/// so the same remote page always comes back as the same [`Page`].
pub struct Enumeration {
    driver: SequenceDriver,
    registry: Arc<Registry>,
    mapping: Arc<dyn FieldMapping>,
    stats: Arc<Mutex<SessionStats>>,
    counted_round_trips: u64,
    finished: bool,
}

impl Enumeration {
    pub(crate) fn new(
        driver: SequenceDriver,
        registry: Arc<Registry>,
        mapping: Arc<dyn FieldMapping>,
        stats: Arc<Mutex<SessionStats>>,
    ) -> Self {
        Self {
            driver,
            registry,
            mapping,
            stats,
            counted_round_trips: 0,
            finished: false,
        }
    }

    /// Next page, or `None` once the remote set is exhausted
    pub async fn next(&mut self) -> Result<Option<Page>> {
        Ok(self.next_merged().await?.map(|(page, _)| page))
    }

    /// Next page together with the fragment that was merged into it
    async fn next_merged(&mut self) -> Result<Option<(Page, PageFragment)>> {
        let item = self.driver.next().await;
        self.count_round_trips();
        let Some(item) = item? else {
            if !self.finished {
                self.finished = true;
                info!(
                    generator = self.driver.generator_name(),
                    items = self.driver.yielded(),
                    round_trips = self.driver.round_trips(),
                    "Enumeration complete"
                );
            }
            return Ok(None);
        };
        let fragment = self.mapping.fragment(&item)?;
        let page = self.registry.ingest(&fragment)?;
        self.stats.lock().add_item();
        Ok(Some((page, fragment)))
    }

    /// Drain every remaining page
    pub async fn collect(mut self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        while let Some(page) = self.next().await? {
            pages.push(page);
        }
        Ok(pages)
    }

    /// Adapt into a [`Stream`] that ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut enumeration = state?;
            match enumeration.next().await {
                Ok(Some(page)) => Some((Ok(page), Some(enumeration))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Cursor to resume from after the pages already yielded
    ///
    /// Only exact at page boundaries: items still buffered are not part of it.
    pub fn cursor(&self) -> &ContinuationCursor {
        self.driver.cursor()
    }

    pub fn state(&self) -> CursorState {
        self.driver.state()
    }

    pub fn round_trips(&self) -> u64 {
        self.driver.round_trips()
    }

    fn count_round_trips(&mut self) {
        let total = self.driver.round_trips();
        if total > self.counted_round_trips {
            self.stats
                .lock()
                .add_round_trips(total - self.counted_round_trips);
            self.counted_round_trips = total;
        }
    }
}

impl std::fmt::Debug for Enumeration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enumeration")
            .field("driver", &self.driver)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Lazy sequence over one page's revision history
///
/// Revisions are folded into the page's history as they arrive; each one is
/// yielded with the canonical page it belongs to.
#[derive(Debug)]
pub struct RevisionStream {
    pages: Enumeration,
    pending: VecDeque<FetchedRevision>,
}

impl RevisionStream {
    pub(crate) fn new(pages: Enumeration) -> Self {
        Self {
            pages,
            pending: VecDeque::new(),
        }
    }

    pub async fn next(&mut self) -> Result<Option<FetchedRevision>> {
        loop {
            if let Some(revision) = self.pending.pop_front() {
                return Ok(Some(revision));
            }
            let Some((page, fragment)) = self.pages.next_merged().await? else {
                return Ok(None);
            };
            if fragment.revisions.is_empty() {
                debug!(page = %page, "Page has no revisions");
                continue;
            }
            // Prefer the merged revision, which may know more than this item
            let history = page.revisions();
            for revision in fragment.revisions {
                let revision = history
                    .iter()
                    .find(|r| r.id == revision.id)
                    .cloned()
                    .unwrap_or(revision);
                self.pending.push_back(FetchedRevision {
                    page: page.clone(),
                    revision,
                });
            }
        }
    }

    pub async fn collect(mut self) -> Result<Vec<FetchedRevision>> {
        let mut revisions = Vec::new();
        while let Some(revision) = self.next().await? {
            revisions.push(revision);
        }
        Ok(revisions)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<FetchedRevision>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut revisions = state?;
            match revisions.next().await {
                Ok(Some(revision)) => Some((Ok(revision), Some(revisions))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    pub fn round_trips(&self) -> u64 {
        self.pages.round_trips()
    }
}
