//! Concrete batch operations
//!
//! Purging, refreshing pages and fetching revisions by id all accept many
//! items per request and report per-item results.

use super::types::{BatchFailure, BatchOperation, Outcome};
use crate::entity::{flag, EntityKey, FieldMapping, Page, PageFragment, Registry, Revision};
use crate::error::{Error, Result};
use crate::generators::query_pages;
use crate::pagination::ContinuationCursor;
use crate::transport::{Endpoint, Transport};
use crate::types::{join_pipe, JsonValue, Params, RawItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const REVISION_PROPS: &str = "ids|timestamp|user|comment|size|flags|content";

type Keyed<V> = Vec<(EntityKey, Outcome<V>)>;

/// Request parameter groups addressing `pages`
///
/// Titles and page ids cannot be mixed in one request, so pages known only
/// by id go into a separate `pageids` group. Duplicates are sent once.
fn page_groups(pages: &[&Page]) -> Vec<(&'static str, String)> {
    let mut titles: Vec<String> = Vec::new();
    let mut ids: Vec<i64> = Vec::new();
    for page in pages {
        match (page.title(), page.id()) {
            (Some(title), _) => {
                if !titles.contains(&title) {
                    titles.push(title);
                }
            }
            (None, Some(id)) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            (None, None) => {}
        }
    }

    let mut groups = Vec::new();
    if !titles.is_empty() {
        groups.push(("titles", join_pipe(titles)));
    }
    if !ids.is_empty() {
        groups.push(("pageids", join_pipe(ids)));
    }
    groups
}

/// `{from, to}` pairs of a query-level array such as `normalized`
fn from_to_pairs<'a>(container: Option<&'a JsonValue>, key: &str) -> Vec<(&'a str, &'a str)> {
    container
        .and_then(|c| c.get(key))
        .and_then(JsonValue::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|entry| {
                    let from = entry.get("from")?.as_str()?;
                    let to = entry.get("to")?.as_str()?;
                    Some((from, to))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn item_key(item: &RawItem) -> EntityKey {
    EntityKey::new(
        item.get("pageid")
            .and_then(JsonValue::as_i64)
            .filter(|id| *id > 0),
        item.get("title")
            .and_then(JsonValue::as_str)
            .map(ToString::to_string),
        item.get("ns").and_then(JsonValue::as_i64).unwrap_or(0) as i32,
    )
}

/// Rejection carried by a `missing`/`invalid` entry
fn rejection(item: &RawItem) -> Option<BatchFailure> {
    if flag(item, "invalid").unwrap_or(false) {
        let reason = item
            .get("invalidreason")
            .and_then(JsonValue::as_str)
            .unwrap_or("invalid title");
        return Some(BatchFailure::rejected(reason));
    }
    if flag(item, "missing").unwrap_or(false) {
        return Some(BatchFailure::rejected("page does not exist"));
    }
    None
}

// ============================================================================
// Purge
// ============================================================================

/// Server-side cache purge (`action=purge`)
///
/// A page that does not exist or whose title is invalid fails; every other
/// page the server reports on succeeds.
pub struct PurgeOperation {
    transport: Arc<dyn Transport>,
    options: PurgeOptions,
}

/// Extra work the server does while purging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOptions {
    /// Update the links tables
    #[serde(default)]
    pub force_link_update: bool,
    /// Update the links tables of pages transcluding the purged ones too
    #[serde(default)]
    pub force_recursive_link_update: bool,
}

impl PurgeOperation {
    pub fn new(transport: Arc<dyn Transport>, options: PurgeOptions) -> Self {
        Self { transport, options }
    }

    fn parse(response: &JsonValue) -> Result<Keyed<()>> {
        let entries = response
            .get("purge")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| Error::decode("purge response has no results"))?;

        // Remote title -> titles it was normalized from
        let mut aliases: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, to) in from_to_pairs(Some(response), "normalized") {
            aliases.entry(to).or_default().push(from);
        }

        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(item) = entry.as_object() else {
                continue;
            };
            let key = item_key(item);
            let outcome = match rejection(item) {
                Some(failure) => Outcome::Failure(failure),
                None => Outcome::Success(()),
            };
            if let Some(from) = key.title.as_deref().and_then(|t| aliases.get(t)) {
                for alias in from {
                    results.push((EntityKey::by_title(*alias), outcome.clone()));
                }
            }
            results.push((key, outcome));
        }
        Ok(results)
    }
}

#[async_trait]
impl BatchOperation for PurgeOperation {
    type Input = Page;
    type Output = ();

    fn name(&self) -> &'static str {
        "purge"
    }

    fn identity(&self, input: &Page) -> EntityKey {
        input.key()
    }

    async fn call(&self, chunk: &[&Page]) -> Result<Keyed<()>> {
        let mut results = Vec::new();
        for (key, value) in page_groups(chunk) {
            let mut params = Params::new();
            params.insert("action".into(), "purge".into());
            params.insert(key.into(), value);
            if self.options.force_link_update {
                params.insert("forcelinkupdate".into(), "1".into());
            }
            if self.options.force_recursive_link_update {
                params.insert("forcerecursivelinkupdate".into(), "1".into());
            }
            let response = self.transport.call(Endpoint::Write, &params).await?;
            results.extend(Self::parse(&response)?);
        }
        Ok(results)
    }
}

// ============================================================================
// Refresh
// ============================================================================

/// What a refresh fetches besides page info
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOptions {
    /// Fetch the latest revision's content
    #[serde(default)]
    pub fetch_content: bool,
    /// Let the server follow redirects and report each hop
    #[serde(default)]
    pub resolve_redirects: bool,
}

/// Bulk page info fetch merged into the registry
///
/// Pages that turn out not to exist succeed with `exists == Some(false)`;
/// only invalid titles fail.
pub struct RefreshOperation {
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
    mapping: Arc<dyn FieldMapping>,
    options: RefreshOptions,
}

impl RefreshOperation {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<Registry>,
        mapping: Arc<dyn FieldMapping>,
        options: RefreshOptions,
    ) -> Self {
        Self {
            transport,
            registry,
            mapping,
            options,
        }
    }

    fn base_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("action".into(), "query".into());
        if self.options.fetch_content {
            params.insert("prop".into(), "info|revisions".into());
            params.insert("rvprop".into(), REVISION_PROPS.into());
            params.insert("rvslots".into(), "main".into());
        } else {
            params.insert("prop".into(), "info".into());
        }
        if self.options.resolve_redirects {
            params.insert("redirects".into(), "1".into());
        }
        params
    }

    /// Merge one response into the registry, collecting keyed results
    fn absorb(&self, response: &JsonValue, results: &mut Keyed<Page>) -> Result<()> {
        for item in query_pages(response)? {
            if flag(&item, "invalid").unwrap_or(false) {
                if let Some(failure) = rejection(&item) {
                    results.push((item_key(&item), Outcome::Failure(failure)));
                }
                continue;
            }
            let fragment = self.mapping.fragment(&item)?;
            let page = self.registry.ingest(&fragment)?;
            results.push((page.key(), Outcome::Success(page)));
        }

        let query = response.get("query");
        for (from, to) in from_to_pairs(query, "redirects") {
            let fragment = PageFragment {
                title: Some(from.to_string()),
                exists: Some(true),
                is_redirect: Some(true),
                redirect_target: Some(EntityKey::by_title(to)),
                ..PageFragment::default()
            };
            let page = self.registry.ingest(&fragment)?;
            results.push((page.key(), Outcome::Success(page)));
        }

        for (from, to) in from_to_pairs(query, "normalized") {
            if let Some(page) = self.registry.get(&EntityKey::by_title(to)) {
                let page = self.registry.alias(from, &page)?;
                results.push((EntityKey::by_title(from), Outcome::Success(page)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BatchOperation for RefreshOperation {
    type Input = Page;
    type Output = Page;

    fn name(&self) -> &'static str {
        "refresh"
    }

    fn identity(&self, input: &Page) -> EntityKey {
        input.key()
    }

    async fn call(&self, chunk: &[&Page]) -> Result<Keyed<Page>> {
        let mut results = Vec::new();
        for (key, value) in page_groups(chunk) {
            let mut base = self.base_params();
            base.insert(key.into(), value);
            let rounds = fetch_all(self.transport.as_ref(), &base, |response| {
                self.absorb(response, &mut results)
            })
            .await?;
            debug!(pages = chunk.len(), rounds, "Refreshed pages");
        }
        Ok(results)
    }
}

// ============================================================================
// Revisions by id
// ============================================================================

/// A revision with the canonical page it belongs to
#[derive(Debug, Clone)]
pub struct FetchedRevision {
    pub page: Page,
    pub revision: Revision,
}

/// Fetch revisions by id (`revids=`)
///
/// The identity of an input is its revision id carried in the key's id slot;
/// these keys never reach the registry.
pub struct RevisionFetch {
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
    mapping: Arc<dyn FieldMapping>,
}

impl RevisionFetch {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<Registry>,
        mapping: Arc<dyn FieldMapping>,
    ) -> Self {
        Self {
            transport,
            registry,
            mapping,
        }
    }

    fn absorb(&self, response: &JsonValue, results: &mut Keyed<FetchedRevision>) -> Result<()> {
        for item in query_pages(response)? {
            let fragment = self.mapping.fragment(&item)?;
            let page = self.registry.ingest(&fragment)?;
            for revision in fragment.revisions {
                results.push((
                    EntityKey::by_id(revision.id),
                    Outcome::Success(FetchedRevision {
                        page: page.clone(),
                        revision,
                    }),
                ));
            }
        }

        let bad: Vec<i64> = match response.get("query").and_then(|q| q.get("badrevids")) {
            Some(JsonValue::Object(map)) => map.keys().filter_map(|k| k.parse().ok()).collect(),
            Some(JsonValue::Array(list)) => list
                .iter()
                .filter_map(|e| e.get("revid").and_then(JsonValue::as_i64))
                .collect(),
            _ => Vec::new(),
        };
        for id in bad {
            results.push((
                EntityKey::by_id(id),
                Outcome::Failure(BatchFailure::rejected("revision does not exist")),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchOperation for RevisionFetch {
    type Input = i64;
    type Output = FetchedRevision;

    fn name(&self) -> &'static str {
        "revisions"
    }

    fn identity(&self, input: &i64) -> EntityKey {
        EntityKey::by_id(*input)
    }

    async fn call(&self, chunk: &[&i64]) -> Result<Keyed<FetchedRevision>> {
        let mut base = Params::new();
        base.insert("action".into(), "query".into());
        base.insert("prop".into(), "revisions".into());
        base.insert("rvprop".into(), REVISION_PROPS.into());
        base.insert("rvslots".into(), "main".into());
        base.insert("revids".into(), join_pipe(chunk.iter().copied()));

        let mut results = Vec::new();
        fetch_all(self.transport.as_ref(), &base, |response| {
            self.absorb(response, &mut results)
        })
        .await?;
        Ok(results)
    }
}

/// Follow `continue` until the request is complete, handing each response to `absorb`
///
/// Returns the number of round-trips.
async fn fetch_all(
    transport: &dyn Transport,
    base: &Params,
    mut absorb: impl FnMut(&JsonValue) -> Result<()> + Send,
) -> Result<usize> {
    let mut cursor = ContinuationCursor::new();
    let mut rounds = 0;
    while !cursor.is_exhausted() {
        let mut params = base.clone();
        params.extend(cursor.params());
        let response = transport.call(Endpoint::Read, &params).await?;
        absorb(&response)?;
        cursor = ContinuationCursor::next_from(&response)?;
        rounds += 1;
    }
    Ok(rounds)
}
