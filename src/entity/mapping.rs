//! Field mapping and title normalization
//!
//! Both are collaborator seams: the core only needs *a* way to turn a raw
//! item into a [`PageFragment`] and *a* way to normalize titles before they
//! are compared. The defaults here follow MediaWiki conventions.

use super::merge::PageFragment;
use super::types::{EntityKey, Revision};
use crate::error::{Error, Result};
use crate::types::{JsonValue, RawItem};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

// ============================================================================
// Title Normalization
// ============================================================================

/// Normalizes titles so that equal pages compare equal
pub trait TitleNormalizer: Send + Sync {
    /// Normalized form of `title`
    fn normalize(&self, title: &str) -> String;
}

/// Namespace-agnostic normalization
///
/// Underscores become spaces, whitespace runs collapse, surrounding
/// whitespace is dropped and the first character is upper-cased.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTitleNormalizer;

impl TitleNormalizer for DefaultTitleNormalizer {
    fn normalize(&self, title: &str) -> String {
        let spaced = title.replace('_', " ");
        let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut chars = collapsed.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

// ============================================================================
// Field Mapping
// ============================================================================

/// Extracts page fragments from raw items
pub trait FieldMapping: Send + Sync {
    /// Fragment described by one raw page item
    fn fragment(&self, item: &RawItem) -> Result<PageFragment>;
}

/// MediaWiki `action=query` page entries (format versions 1 and 2)
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaWikiFieldMapping;

impl FieldMapping for MediaWikiFieldMapping {
    fn fragment(&self, item: &RawItem) -> Result<PageFragment> {
        let id = item
            .get("pageid")
            .and_then(JsonValue::as_i64)
            .filter(|id| *id > 0);
        let title = item
            .get("title")
            .and_then(JsonValue::as_str)
            .map(ToString::to_string);

        if id.is_none() && title.is_none() {
            return Err(Error::decode(format!(
                "page entry has neither pageid nor title: {}",
                JsonValue::Object(item.clone())
            )));
        }

        let missing = flag(item, "missing").unwrap_or(false);
        let invalid = flag(item, "invalid").unwrap_or(false);
        let exists = if missing || invalid {
            Some(false)
        } else if id.is_some() {
            Some(true)
        } else {
            None
        };

        let last_revision_id = item.get("lastrevid").and_then(JsonValue::as_i64);
        let has_info = last_revision_id.is_some() || item.contains_key("touched");
        let is_redirect = match flag(item, "redirect") {
            Some(value) => Some(value),
            None if has_info || exists == Some(false) => Some(false),
            None => None,
        };

        let revisions: Vec<Revision> = item
            .get("revisions")
            .and_then(JsonValue::as_array)
            .map(|revs| revs.iter().filter_map(parse_revision).collect())
            .unwrap_or_default();

        // Page content is only the text of the latest revision
        let content = last_revision_id.and_then(|latest| {
            revisions
                .iter()
                .find(|r| r.id == latest)
                .and_then(|r| r.content.clone())
        });

        let redirect_target = content
            .as_deref()
            .and_then(parse_redirect_target)
            .map(EntityKey::by_title);

        Ok(PageFragment {
            id,
            title,
            namespace: item
                .get("ns")
                .and_then(JsonValue::as_i64)
                .map(|ns| ns as i32),
            exists,
            is_redirect,
            content,
            content_length: item.get("length").and_then(JsonValue::as_u64),
            last_revision_id,
            touched: item.get("touched").and_then(parse_timestamp),
            redirect_target,
            revisions,
        })
    }
}

/// Read a MediaWiki boolean
///
/// Format version 2 sends real booleans. Version 1 signals `true` by the mere
/// presence of the key (usually with an empty string); the string `"false"`
/// is accepted as `false` as some extensions emit it.
pub fn flag(item: &RawItem, key: &str) -> Option<bool> {
    match item.get(key)? {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Null => Some(false),
        JsonValue::String(s) => Some(!s.eq_ignore_ascii_case("false")),
        _ => Some(true),
    }
}

/// Parse an ISO-8601 timestamp as sent by the API
pub fn parse_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse one entry of a `revisions` array
pub fn parse_revision(value: &JsonValue) -> Option<Revision> {
    let obj = value.as_object()?;
    let id = obj.get("revid").and_then(JsonValue::as_i64)?;
    let main_slot = obj
        .get("slots")
        .and_then(|slots| slots.get("main"))
        .and_then(JsonValue::as_object);
    let content = main_slot
        .and_then(|slot| slot.get("content").or_else(|| slot.get("*")))
        .or_else(|| obj.get("content").or_else(|| obj.get("*")))
        .and_then(JsonValue::as_str)
        .map(ToString::to_string);

    Some(Revision {
        id,
        parent_id: obj.get("parentid").and_then(JsonValue::as_i64),
        timestamp: obj.get("timestamp").and_then(parse_timestamp),
        user: obj
            .get("user")
            .and_then(JsonValue::as_str)
            .map(ToString::to_string),
        comment: obj
            .get("comment")
            .and_then(JsonValue::as_str)
            .map(ToString::to_string),
        size: obj.get("size").and_then(JsonValue::as_u64),
        minor: flag(obj, "minor"),
        content,
    })
}

/// Matches `#REDIRECT [[Target]]`, capturing the target up to any anchor or label
static REDIRECT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#REDIRECT\s*:?\s*\[\[([^\]|#]*)").expect("redirect pattern is valid")
});

/// Target of a `#REDIRECT [[Target]]` page text, without any section anchor
pub fn parse_redirect_target(content: &str) -> Option<String> {
    let target = REDIRECT_REGEX.captures(content)?.get(1)?.as_str().trim();
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}
