//! Common types used throughout wikiclient
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Request parameters, ordered so that logged requests are stable
pub type Params = BTreeMap<String, String>;

/// One untyped document describing a remote entity, as returned by the API
pub type RawItem = JsonObject;

// ============================================================================
// Sort Direction
// ============================================================================

/// Direction in which time-ordered lists are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Newest first
    #[default]
    Older,
    /// Oldest first
    Newer,
}

impl SortDirection {
    /// Wire value of the direction
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Older => "older",
            SortDirection::Newer => "newer",
        }
    }
}

// ============================================================================
// Redirect Filter
// ============================================================================

/// How list generators treat redirect pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectFilter {
    /// Include both redirects and regular pages
    #[default]
    All,
    /// Only redirects
    Redirects,
    /// Only regular pages
    NonRedirects,
}

impl RedirectFilter {
    /// Wire value of the filter
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectFilter::All => "all",
            RedirectFilter::Redirects => "redirects",
            RedirectFilter::NonRedirects => "nonredirects",
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Log Level
// ============================================================================

/// Log level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle blank strings
pub trait OptionStringExt {
    /// Returns None if the string is empty or whitespace only
    fn none_if_blank(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_blank(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_blank(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Join values with the pipe separator used by multi-value parameters
pub fn join_pipe<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: ToString,
{
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_direction_serde() {
        let dir: SortDirection = serde_json::from_str("\"newer\"").unwrap();
        assert_eq!(dir, SortDirection::Newer);
        assert_eq!(SortDirection::default().as_str(), "older");
    }

    #[test]
    fn test_redirect_filter_wire_values() {
        assert_eq!(RedirectFilter::All.as_str(), "all");
        assert_eq!(RedirectFilter::NonRedirects.as_str(), "nonredirects");
        let filter: RedirectFilter = serde_json::from_str("\"redirects\"").unwrap();
        assert_eq!(filter, RedirectFilter::Redirects);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(tracing::Level::DEBUG, tracing::Level::from(LogLevel::Debug));
        assert_eq!(tracing::Level::ERROR, tracing::Level::from(LogLevel::Error));
    }

    #[test]
    fn test_option_string_none_if_blank() {
        assert_eq!(
            Some("test".to_string()).none_if_blank(),
            Some("test".to_string())
        );
        assert_eq!(Some("  ".to_string()).none_if_blank(), None);
        assert_eq!(None::<String>.none_if_blank(), None);
        assert_eq!("".to_string().none_if_blank(), None);
    }

    #[test]
    fn test_join_pipe() {
        assert_eq!(join_pipe([0, 4, 10]), "0|4|10");
        assert_eq!(join_pipe(Vec::<i32>::new()), "");
    }
}
