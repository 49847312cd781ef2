//! Pagination types
//!
//! Defines the continuation cursor threaded between round-trips.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, Params};
use serde::{Deserialize, Serialize};

/// Where a paginated sequence stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No round-trip issued yet
    NotStarted,
    /// At least one page fetched, more available
    InProgress,
    /// The remote reported no further pages
    Exhausted,
}

/// Opaque continuation token plus exhaustion flag
///
/// The token is whatever object the remote returned under `continue`. It is
/// never inspected, only merged back into the next request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuationCursor {
    /// Continuation token from the last response
    pub token: Option<JsonObject>,
    /// Whether the sequence has ended
    pub exhausted: bool,
}

impl ContinuationCursor {
    /// Cursor before the first round-trip
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal cursor
    pub fn exhausted() -> Self {
        Self {
            token: None,
            exhausted: true,
        }
    }

    /// Cursor that resumes from `token`
    pub fn resume(token: JsonObject) -> Self {
        Self {
            token: Some(token),
            exhausted: false,
        }
    }

    /// Current state
    pub fn state(&self) -> CursorState {
        match (self.exhausted, &self.token) {
            (true, _) => CursorState::Exhausted,
            (false, None) => CursorState::NotStarted,
            (false, Some(_)) => CursorState::InProgress,
        }
    }

    /// Check if the sequence has ended
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Cursor following a response
    ///
    /// A response without a `continue` object ends the sequence.
    pub fn next_from(response: &JsonValue) -> Result<Self> {
        match response.get("continue") {
            None | Some(JsonValue::Null) => Ok(Self::exhausted()),
            Some(JsonValue::Object(token)) if token.is_empty() => Ok(Self::exhausted()),
            Some(JsonValue::Object(token)) => Ok(Self::resume(token.clone())),
            Some(other) => Err(Error::decode(format!(
                "continuation must be an object, got {other}"
            ))),
        }
    }

    /// Request parameters carrying the token
    pub fn params(&self) -> Params {
        let Some(token) = &self.token else {
            return Params::new();
        };
        token
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}
