//! Entity types
//!
//! Keys, page handles and the mutable state behind them.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

// ============================================================================
// Entity Key
// ============================================================================

/// Identity of one remote page
///
/// Two keys denote the same page when both carry a numeric id and the ids are
/// equal, or otherwise when their (normalized) titles are equal. See
/// [`EntityKey::matches`]. The derived `PartialEq`/`Hash` are structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Remote page id, once known
    pub id: Option<i64>,
    /// Full page title including any namespace prefix
    pub title: Option<String>,
    /// Namespace id (informational; not part of identity)
    #[serde(default)]
    pub namespace: i32,
}

impl EntityKey {
    /// Create a key from all parts
    pub fn new(id: Option<i64>, title: Option<String>, namespace: i32) -> Self {
        Self {
            id,
            title,
            namespace,
        }
    }

    /// Key for a page known only by id
    pub fn by_id(id: i64) -> Self {
        Self::new(Some(id), None, 0)
    }

    /// Key for a page known only by title
    pub fn by_title(title: impl Into<String>) -> Self {
        Self::new(None, Some(title.into()), 0)
    }

    /// Set the namespace
    #[must_use]
    pub fn in_namespace(mut self, namespace: i32) -> Self {
        self.namespace = namespace;
        self
    }

    /// Whether the key carries no identity at all
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.title.is_none()
    }

    /// Identity comparison: ids take precedence once both sides know them
    ///
    /// Titles are compared verbatim; callers normalize first.
    pub fn matches(&self, other: &EntityKey) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => match (&self.title, &other.title) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.title, self.id) {
            (Some(title), _) => write!(f, "{title}"),
            (None, Some(id)) => write!(f, "#{id}"),
            (None, None) => write!(f, "<empty>"),
        }
    }
}

// ============================================================================
// Revision
// ============================================================================

/// One revision of a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision id
    pub id: i64,
    /// Id of the previous revision
    pub parent_id: Option<i64>,
    /// When the revision was saved
    pub timestamp: Option<DateTime<Utc>>,
    /// Author name
    pub user: Option<String>,
    /// Edit summary
    pub comment: Option<String>,
    /// Size in bytes
    pub size: Option<u64>,
    /// Whether the edit was flagged minor
    pub minor: Option<bool>,
    /// Revision text
    pub content: Option<String>,
}

impl Revision {
    /// Create a revision with only its id known
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Fold the known fields of `other` into `self`; returns whether anything changed
    pub(crate) fn absorb(&mut self, other: &Revision) -> bool {
        let mut changed = false;
        changed |= overwrite(&mut self.parent_id, &other.parent_id);
        changed |= overwrite(&mut self.timestamp, &other.timestamp);
        changed |= overwrite(&mut self.user, &other.user);
        changed |= overwrite(&mut self.comment, &other.comment);
        changed |= overwrite(&mut self.size, &other.size);
        changed |= overwrite(&mut self.minor, &other.minor);
        changed |= overwrite(&mut self.content, &other.content);
        changed
    }
}

/// Overwrite `slot` with `value` when `value` is known
pub(crate) fn overwrite<T: Clone + PartialEq>(slot: &mut Option<T>, value: &Option<T>) -> bool {
    match value {
        Some(v) if slot.as_ref() != Some(v) => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}

// ============================================================================
// Page State
// ============================================================================

/// Everything known about one page
///
/// Fields stay `None` until some fetch reports them and never go back to
/// `None` afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    /// Identity of the page
    pub key: EntityKey,
    /// Whether the page exists remotely
    pub exists: Option<bool>,
    /// Whether the page is a redirect
    pub is_redirect: Option<bool>,
    /// Latest known content
    pub content: Option<String>,
    /// Content length in bytes
    pub content_length: Option<u64>,
    /// Id of the latest revision
    pub last_revision_id: Option<i64>,
    /// Last time the page was touched
    pub touched: Option<DateTime<Utc>>,
    /// Where the page redirects to
    pub redirect_target: Option<EntityKey>,
    /// Revisions seen so far, ordered by id
    pub revisions: Vec<Revision>,
    /// Incremented on every effective change
    pub version: u64,
}

impl PageState {
    /// Fresh state for a key
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Whether any fetch has reported on this page
    pub fn is_fetched(&self) -> bool {
        self.exists.is_some()
    }
}

// ============================================================================
// Page Handle
// ============================================================================

/// Shared handle to the canonical entity of one remote page
///
/// Cloning a `Page` clones the handle, never the state: every holder observes
/// every merge. When the registry folds two entries into one, the discarded
/// handle forwards to the surviving one, so [`Page::same`] and all accessors
/// keep working through stale handles.
#[derive(Clone)]
pub struct Page(Arc<PageCell>);

struct PageCell {
    /// Creation order within the registry
    serial: u64,
    /// Set once when this entry was folded into another
    forward: OnceLock<Page>,
    state: RwLock<PageState>,
}

impl Page {
    pub(crate) fn new(serial: u64, key: EntityKey) -> Self {
        Self(Arc::new(PageCell {
            serial,
            forward: OnceLock::new(),
            state: RwLock::new(PageState::new(key)),
        }))
    }

    /// Follow forwarding to the surviving instance
    pub fn canonical(&self) -> Page {
        let mut current = self.clone();
        while let Some(next) = current.0.forward.get() {
            current = next.clone();
        }
        current
    }

    /// Whether both handles refer to the same canonical entity
    pub fn same(&self, other: &Page) -> bool {
        Arc::ptr_eq(&self.canonical().0, &other.canonical().0)
    }

    /// Whether this handle was folded into another entry
    pub fn is_forwarded(&self) -> bool {
        self.0.forward.get().is_some()
    }

    pub(crate) fn serial(&self) -> u64 {
        self.canonical().0.serial
    }

    pub(crate) fn forward_to(&self, target: &Page) -> bool {
        self.0.forward.set(target.clone()).is_ok()
    }

    /// Run `f` with shared access to the canonical state
    pub fn read<R>(&self, f: impl FnOnce(&PageState) -> R) -> R {
        let canonical = self.canonical();
        let guard = canonical.0.state.read();
        f(&guard)
    }

    /// Run `f` with exclusive access to the canonical state
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        let canonical = self.canonical();
        let mut guard = canonical.0.state.write();
        f(&mut guard)
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> PageState {
        self.read(PageState::clone)
    }

    /// Current key
    pub fn key(&self) -> EntityKey {
        self.read(|s| s.key.clone())
    }

    /// Page id, once known
    pub fn id(&self) -> Option<i64> {
        self.read(|s| s.key.id)
    }

    /// Page title, once known
    pub fn title(&self) -> Option<String> {
        self.read(|s| s.key.title.clone())
    }

    /// Namespace id
    pub fn namespace(&self) -> i32 {
        self.read(|s| s.key.namespace)
    }

    /// Whether the page exists, once known
    pub fn exists(&self) -> Option<bool> {
        self.read(|s| s.exists)
    }

    /// Whether the page is a redirect, once known
    pub fn is_redirect(&self) -> Option<bool> {
        self.read(|s| s.is_redirect)
    }

    /// Redirect target, only when the page is known to be a redirect
    pub fn redirect_target(&self) -> Option<EntityKey> {
        self.read(|s| match s.is_redirect {
            Some(true) => s.redirect_target.clone(),
            _ => None,
        })
    }

    /// Latest known content
    pub fn content(&self) -> Option<String> {
        self.read(|s| s.content.clone())
    }

    /// Id of the latest revision
    pub fn last_revision_id(&self) -> Option<i64> {
        self.read(|s| s.last_revision_id)
    }

    /// Revisions seen so far
    pub fn revisions(&self) -> Vec<Revision> {
        self.read(|s| s.revisions.clone())
    }

    /// Change counter of the state
    pub fn version(&self) -> u64 {
        self.read(|s| s.version)
    }

    /// Whether any fetch has been merged into this page
    pub fn is_fetched(&self) -> bool {
        self.read(PageState::is_fetched)
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.snapshot();
        f.debug_struct("Page")
            .field("key", &state.key)
            .field("exists", &state.exists)
            .field("is_redirect", &state.is_redirect)
            .field("version", &state.version)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
