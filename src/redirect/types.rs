//! Redirect resolution types

use crate::entity::{EntityKey, Page};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Fetches page data on demand while a chain is followed
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Fetch `page` and merge the result; returns the canonical page
    async fn load(&self, page: &Page) -> Result<Page>;
}

/// Keys visited while following a redirect chain, in order
///
/// Starts with the page resolution began at and ends with the last redirect
/// before the target; the target itself is not part of the path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectPath(Vec<EntityKey>);

impl RedirectPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: EntityKey) {
        self.0.push(key);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[EntityKey] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityKey> {
        self.0.iter()
    }

    /// Display form of every key
    pub fn titles(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for RedirectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.titles().join(" -> "))
    }
}

/// Outcome of following a redirect chain
#[derive(Debug, Clone)]
pub struct RedirectResolution {
    /// First page of the chain that is not a redirect
    pub target: Page,
    /// Redirects passed on the way
    pub path: RedirectPath,
}

impl RedirectResolution {
    /// Whether the start page was itself the target
    pub fn is_direct(&self) -> bool {
        self.path.is_empty()
    }
}
