//! Entity identity registry
//!
//! Guarantees one canonical [`Page`] per remote page within a session,
//! whichever mix of ids and titles the page was first referenced by.

use super::mapping::{DefaultTitleNormalizer, TitleNormalizer};
use super::merge::{apply_fragment, PageFragment};
use super::types::{EntityKey, Page};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default)]
struct Index {
    next_serial: u64,
    by_id: HashMap<i64, Page>,
    by_title: HashMap<String, Page>,
}

impl Index {
    fn create(&mut self, key: EntityKey) -> Page {
        self.next_serial += 1;
        Page::new(self.next_serial, key)
    }

    fn lookup_id(&self, id: i64) -> Option<Page> {
        self.by_id.get(&id).map(Page::canonical)
    }

    fn lookup_title(&self, title: &str) -> Option<Page> {
        self.by_title.get(title).map(Page::canonical)
    }

    /// Replace entries that point at folded pages
    fn compact(&mut self) {
        for page in self.by_id.values_mut().chain(self.by_title.values_mut()) {
            if page.is_forwarded() {
                *page = page.canonical();
            }
        }
    }
}

/// Session-scoped map from remote identity to canonical page
///
/// Lock order is index first, then page state. Merges never hold a page lock
/// while waiting for the index, and no lock is held across an `.await`.
pub struct Registry {
    index: Mutex<Index>,
    normalizer: Arc<dyn TitleNormalizer>,
}

impl Registry {
    /// Create a registry with the default title normalizer
    pub fn new() -> Self {
        Self::with_normalizer(Arc::new(DefaultTitleNormalizer))
    }

    /// Create a registry with a custom title normalizer
    pub fn with_normalizer(normalizer: Arc<dyn TitleNormalizer>) -> Self {
        Self {
            index: Mutex::new(Index::default()),
            normalizer,
        }
    }

    /// Normalize a title the way lookups do
    pub fn normalize(&self, title: &str) -> String {
        self.normalizer.normalize(title)
    }

    /// Normalize the title part of a key
    pub fn normalize_key(&self, key: &EntityKey) -> EntityKey {
        EntityKey::new(
            key.id,
            key.title.as_deref().map(|t| self.normalize(t)),
            key.namespace,
        )
    }

    /// Existing page for `key`, or a new unfetched one
    pub fn resolve(&self, key: &EntityKey) -> Result<Page> {
        if key.is_empty() {
            return Err(Error::invalid_request("cannot resolve an empty key"));
        }
        let key = self.normalize_key(key);
        let mut index = self.index.lock();
        self.locate(&mut index, &key)
    }

    /// Existing page for `key`, without creating one
    pub fn get(&self, key: &EntityKey) -> Option<Page> {
        let key = self.normalize_key(key);
        let index = self.index.lock();
        key.id
            .and_then(|id| index.lookup_id(id))
            .or_else(|| key.title.as_deref().and_then(|t| index.lookup_title(t)))
    }

    /// Merge fresh data into `page` in place
    ///
    /// When the fragment reveals that `page` is the same remote page as
    /// another registered entry, the two are folded first. The whole step runs
    /// under the index lock, so other tasks observe it fully applied or not
    /// at all.
    pub fn merge(&self, page: &Page, fragment: &PageFragment) -> Result<Page> {
        let mut index = self.index.lock();
        let mut target = page.canonical();

        // Id and title may each point at a different entry; fold both
        let key = self.normalize_key(&fragment.key());
        let by_id = key.id.and_then(|id| index.lookup_id(id));
        let by_title = key.title.as_deref().and_then(|t| index.lookup_title(t));

        if let (Some(id), Some(other)) = (key.id, &by_title) {
            match other.id() {
                Some(existing) if existing != id => {
                    return Err(Error::identity_conflict(
                        key.clone(),
                        format!("title is already bound to page id {existing}"),
                    ));
                }
                _ => {}
            }
        }

        for other in by_id.into_iter().chain(by_title) {
            if !other.same(&target) {
                target = self.fold(&mut index, target, other.canonical())?;
            }
        }

        self.apply(&mut index, &target, fragment)?;
        Ok(target)
    }

    /// Find or create the page a fragment describes and merge it
    pub fn ingest(&self, fragment: &PageFragment) -> Result<Page> {
        let key = self.normalize_key(&fragment.key());
        if key.is_empty() {
            return Err(Error::decode("fragment carries no identity"));
        }
        let mut index = self.index.lock();
        let page = self.locate(&mut index, &key)?;
        self.apply(&mut index, &page, fragment)?;
        Ok(page)
    }

    /// Register `alias` as another name of `page`
    ///
    /// Used for titles the remote reported as normalized to another title.
    pub fn alias(&self, alias: &str, page: &Page) -> Result<Page> {
        let alias = self.normalize(alias);
        let mut index = self.index.lock();
        let target = page.canonical();
        match index.lookup_title(&alias) {
            Some(existing) if existing.same(&target) => Ok(target),
            Some(existing) => self.fold(&mut index, target, existing),
            None => {
                index.by_title.insert(alias, target.clone());
                Ok(target)
            }
        }
    }

    /// Number of distinct canonical pages
    pub fn len(&self) -> usize {
        self.pages().len()
    }

    /// Whether the registry holds no pages
    pub fn is_empty(&self) -> bool {
        let index = self.index.lock();
        index.by_id.is_empty() && index.by_title.is_empty()
    }

    /// All distinct canonical pages, in creation order
    pub fn pages(&self) -> Vec<Page> {
        let index = self.index.lock();
        let mut pages: Vec<Page> = Vec::new();
        for page in index.by_id.values().chain(index.by_title.values()) {
            let page = page.canonical();
            if !pages.iter().any(|p| p.same(&page)) {
                pages.push(page);
            }
        }
        pages.sort_by_key(Page::serial);
        pages
    }

    /// Drop every entry; pages still held elsewhere become detached snapshots
    pub fn clear(&self) {
        let mut index = self.index.lock();
        *index = Index::default();
    }

    // ------------------------------------------------------------------------

    fn locate(&self, index: &mut Index, key: &EntityKey) -> Result<Page> {
        let by_id = key.id.and_then(|id| index.lookup_id(id));
        let by_title = key.title.as_deref().and_then(|t| index.lookup_title(t));

        let page = match (by_id, by_title) {
            (Some(a), Some(b)) if a.same(&b) => a,
            (Some(a), Some(b)) => self.fold(index, a, b)?,
            (Some(a), None) => {
                if let Some(title) = &key.title {
                    if a.title().is_none() {
                        a.write(|s| s.key.title = Some(title.clone()));
                    }
                    index.by_title.insert(title.clone(), a.clone());
                }
                a
            }
            (None, Some(b)) => {
                if let Some(id) = key.id {
                    match b.id() {
                        None => {
                            b.write(|s| s.key.id = Some(id));
                            index.by_id.insert(id, b.clone());
                        }
                        Some(existing) if existing != id => {
                            return Err(Error::identity_conflict(
                                key.clone(),
                                format!("title is already bound to page id {existing}"),
                            ));
                        }
                        Some(_) => {}
                    }
                }
                b
            }
            (None, None) => {
                let page = index.create(key.clone());
                if let Some(id) = key.id {
                    index.by_id.insert(id, page.clone());
                }
                if let Some(title) = &key.title {
                    index.by_title.insert(title.clone(), page.clone());
                }
                debug!(key = %key, "Registered new page");
                page
            }
        };
        Ok(page)
    }

    /// Apply a fragment and index whatever identity it added
    fn apply(&self, index: &mut Index, page: &Page, fragment: &PageFragment) -> Result<()> {
        page.write(|state| apply_fragment(state, fragment))?;

        let key = page.key();
        if let Some(id) = key.id {
            index.by_id.entry(id).or_insert_with(|| page.clone());
        }
        if let Some(title) = key.title.as_deref() {
            let title = self.normalize(title);
            index.by_title.entry(title).or_insert_with(|| page.clone());
        }
        Ok(())
    }

    /// Fold two entries for the same remote page into the older one
    ///
    /// The newer entry's known data is replayed into the survivor first. If
    /// both carry fetched data that disagrees, nothing is changed and an
    /// [`Error::IdentityConflict`] is returned.
    fn fold(&self, index: &mut Index, a: Page, b: Page) -> Result<Page> {
        let (keep, discard) = if a.serial() <= b.serial() {
            (a, b)
        } else {
            (b, a)
        };

        let replay = discard.read(PageFragment::from_state);
        let conflicts = keep.read(|state| replay.conflicts_with(state));
        if !conflicts.is_empty() {
            let key = keep.key();
            warn!(key = %key, fields = ?conflicts, "Refusing to fold conflicting entries");
            return Err(Error::identity_conflict(
                key,
                format!(
                    "two entries for the same page disagree on {}",
                    conflicts.join(", ")
                ),
            ));
        }

        keep.write(|state| apply_fragment(state, &replay))?;
        discard.forward_to(&keep);
        index.compact();

        debug!(key = %keep.key(), "Folded duplicate page entries");
        Ok(keep)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("pages", &self.len())
            .finish_non_exhaustive()
    }
}
