//! Generator trait and query descriptor

use super::lists::{AllPages, Backlinks, CategoryMembers, QueryPage, Search, TranscludedIn};
use super::revisions::Revisions;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Params, RawItem};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One kind of remote enumeration
///
/// A generator knows how to ask for the first page and how to pull raw items
/// out of a response. Continuation is handled by the pagination driver.
pub trait Generator: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Parameters of the first request
    ///
    /// Fails with [`Error::InvalidRequest`] when a required filter is missing,
    /// before any round-trip is made.
    fn build_request(&self, page_size: u32) -> Result<Params>;

    /// Raw items of one response, in remote order
    fn parse_page(&self, response: &JsonValue) -> Result<Vec<RawItem>> {
        query_pages(response)
    }
}

/// Page entries under `query.pages`
///
/// Accepts both the list form (format version 2) and the id-keyed map form
/// (version 1). Entries carrying an `index` field are ordered by it, since the
/// remote does not keep generator order in the page set.
pub fn query_pages(response: &JsonValue) -> Result<Vec<RawItem>> {
    let Some(pages) = response.get("query").and_then(|q| q.get("pages")) else {
        return Ok(Vec::new());
    };

    let entries: Vec<&JsonValue> = match pages {
        JsonValue::Array(list) => list.iter().collect(),
        JsonValue::Object(map) => map.values().collect(),
        other => {
            return Err(Error::decode(format!(
                "query.pages must be a list or map, got {other}"
            )))
        }
    };

    let mut items = entries
        .into_iter()
        .map(|entry| {
            entry
                .as_object()
                .cloned()
                .ok_or_else(|| Error::decode(format!("page entry is not an object: {entry}")))
        })
        .collect::<Result<Vec<RawItem>>>()?;

    items.sort_by_key(|item| {
        item.get("index")
            .and_then(JsonValue::as_i64)
            .unwrap_or(i64::MAX)
    });
    Ok(items)
}

/// Require a non-blank string parameter
pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::invalid_request(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

/// Base parameters shared by every `action=query` generator
pub(crate) fn query_params(generator: &str) -> Params {
    let mut params = Params::new();
    params.insert("action".into(), "query".into());
    params.insert("generator".into(), generator.into());
    params.insert("prop".into(), "info".into());
    params
}

// ============================================================================
// Query Descriptor
// ============================================================================

/// Caller-owned description of an enumeration
///
/// Pure data: it can be read from JSON or YAML and handed to
/// [`Session::enumerate`](crate::session::Session::enumerate).
///
/// ```
/// use wikiclient::generators::QueryDescriptor;
///
/// let descriptor: QueryDescriptor =
///     serde_json::from_str(r#"{"type": "search", "query": "rust"}"#).unwrap();
/// assert_eq!(descriptor.as_generator().name(), "search");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryDescriptor {
    AllPages(AllPages),
    Search(Search),
    Backlinks(Backlinks),
    CategoryMembers(CategoryMembers),
    TranscludedIn(TranscludedIn),
    QueryPage(QueryPage),
    Revisions(Revisions),
}

impl QueryDescriptor {
    /// The generator behind the descriptor
    pub fn as_generator(&self) -> &dyn Generator {
        match self {
            QueryDescriptor::AllPages(g) => g,
            QueryDescriptor::Search(g) => g,
            QueryDescriptor::Backlinks(g) => g,
            QueryDescriptor::CategoryMembers(g) => g,
            QueryDescriptor::TranscludedIn(g) => g,
            QueryDescriptor::QueryPage(g) => g,
            QueryDescriptor::Revisions(g) => g,
        }
    }
}

impl Generator for QueryDescriptor {
    fn name(&self) -> &'static str {
        self.as_generator().name()
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        self.as_generator().build_request(page_size)
    }

    fn parse_page(&self, response: &JsonValue) -> Result<Vec<RawItem>> {
        self.as_generator().parse_page(response)
    }
}

macro_rules! descriptor_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for QueryDescriptor {
                fn from(generator: $variant) -> Self {
                    QueryDescriptor::$variant(generator)
                }
            }
        )*
    };
}

descriptor_from!(
    AllPages,
    Search,
    Backlinks,
    CategoryMembers,
    TranscludedIn,
    QueryPage,
    Revisions
);
