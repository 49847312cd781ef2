//! List generators
//!
//! Each of these wraps one `list=` module of the query API used as a page
//! generator, so every returned entry is a page with its info properties.

use super::types::{query_params, required, Generator};
use crate::error::Result;
use crate::types::{join_pipe, OptionStringExt, Params, RedirectFilter};
use serde::{Deserialize, Serialize};

const CATEGORY_PREFIX: &str = "Category:";

fn set_namespaces(params: &mut Params, key: &str, namespaces: &[i32]) {
    if !namespaces.is_empty() {
        params.insert(key.into(), join_pipe(namespaces));
    }
}

fn set_filter(params: &mut Params, key: &str, filter: RedirectFilter) {
    if filter != RedirectFilter::All {
        params.insert(key.into(), filter.as_str().into());
    }
}

// ============================================================================
// All Pages
// ============================================================================

/// Every page of one namespace, in title order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllPages {
    #[serde(default)]
    pub namespace: i32,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub redirects: RedirectFilter,
}

impl AllPages {
    pub fn new(namespace: i32) -> Self {
        Self {
            namespace,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn redirects(mut self, filter: RedirectFilter) -> Self {
        self.redirects = filter;
        self
    }
}

impl Generator for AllPages {
    fn name(&self) -> &'static str {
        "allpages"
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        let mut params = query_params("allpages");
        params.insert("gapnamespace".into(), self.namespace.to_string());
        params.insert("gaplimit".into(), page_size.to_string());
        if let Some(prefix) = self.prefix.clone().none_if_blank() {
            params.insert("gapprefix".into(), prefix);
        }
        set_filter(&mut params, "gapfilterredir", self.redirects);
        Ok(params)
    }
}

// ============================================================================
// Search
// ============================================================================

/// Full-text search hits, in relevance order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Search {
    pub query: String,
    #[serde(default)]
    pub namespaces: Vec<i32>,
}

impl Search {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            namespaces: Vec::new(),
        }
    }

    #[must_use]
    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = i32>) -> Self {
        self.namespaces = namespaces.into_iter().collect();
        self
    }
}

impl Generator for Search {
    fn name(&self) -> &'static str {
        "search"
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        let query = required("search query", &self.query)?;
        let mut params = query_params("search");
        params.insert("gsrsearch".into(), query.into());
        params.insert("gsrlimit".into(), page_size.to_string());
        set_namespaces(&mut params, "gsrnamespace", &self.namespaces);
        Ok(params)
    }
}

// ============================================================================
// Backlinks
// ============================================================================

/// Pages linking to a title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Backlinks {
    pub title: String,
    #[serde(default)]
    pub namespaces: Vec<i32>,
    #[serde(default)]
    pub redirects: RedirectFilter,
}

impl Backlinks {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = i32>) -> Self {
        self.namespaces = namespaces.into_iter().collect();
        self
    }

    #[must_use]
    pub fn redirects(mut self, filter: RedirectFilter) -> Self {
        self.redirects = filter;
        self
    }
}

impl Generator for Backlinks {
    fn name(&self) -> &'static str {
        "backlinks"
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        let title = required("backlinks title", &self.title)?;
        let mut params = query_params("backlinks");
        params.insert("gbltitle".into(), title.into());
        params.insert("gbllimit".into(), page_size.to_string());
        set_namespaces(&mut params, "gblnamespace", &self.namespaces);
        set_filter(&mut params, "gblfilterredir", self.redirects);
        Ok(params)
    }
}

// ============================================================================
// Category Members
// ============================================================================

/// Pages in a category
///
/// A title without the `Category:` prefix gets one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMembers {
    pub title: String,
    #[serde(default)]
    pub namespaces: Vec<i32>,
}

impl CategoryMembers {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            namespaces: Vec::new(),
        }
    }

    #[must_use]
    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = i32>) -> Self {
        self.namespaces = namespaces.into_iter().collect();
        self
    }

    /// Category title with its namespace prefix
    pub fn category_title(&self) -> Result<String> {
        let title = required("category title", &self.title)?;
        let has_prefix = title
            .get(..CATEGORY_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(CATEGORY_PREFIX));
        Ok(if has_prefix {
            title.to_string()
        } else {
            format!("{CATEGORY_PREFIX}{title}")
        })
    }
}

impl Generator for CategoryMembers {
    fn name(&self) -> &'static str {
        "categorymembers"
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        let mut params = query_params("categorymembers");
        params.insert("gcmtitle".into(), self.category_title()?);
        params.insert("gcmlimit".into(), page_size.to_string());
        set_namespaces(&mut params, "gcmnamespace", &self.namespaces);
        Ok(params)
    }
}

// ============================================================================
// Transcluded In
// ============================================================================

/// Pages that transclude a title (usually a template)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscludedIn {
    pub title: String,
    #[serde(default)]
    pub namespaces: Vec<i32>,
    #[serde(default)]
    pub redirects: RedirectFilter,
}

impl TranscludedIn {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = i32>) -> Self {
        self.namespaces = namespaces.into_iter().collect();
        self
    }

    #[must_use]
    pub fn redirects(mut self, filter: RedirectFilter) -> Self {
        self.redirects = filter;
        self
    }
}

impl Generator for TranscludedIn {
    fn name(&self) -> &'static str {
        "embeddedin"
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        let title = required("transcluded title", &self.title)?;
        let mut params = query_params("embeddedin");
        params.insert("geititle".into(), title.into());
        params.insert("geilimit".into(), page_size.to_string());
        set_namespaces(&mut params, "geinamespace", &self.namespaces);
        set_filter(&mut params, "geifilterredir", self.redirects);
        Ok(params)
    }
}

// ============================================================================
// Query Page
// ============================================================================

/// Results of a special query page such as `Ancientpages`
///
/// The page name is case sensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPage {
    pub page: String,
}

impl QueryPage {
    pub fn new(page: impl Into<String>) -> Self {
        Self { page: page.into() }
    }
}

impl Generator for QueryPage {
    fn name(&self) -> &'static str {
        "querypage"
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        let page = required("query page name", &self.page)?;
        let mut params = query_params("querypage");
        params.insert("gqppage".into(), page.into());
        params.insert("gqplimit".into(), page_size.to_string());
        Ok(params)
    }
}
