//! Batch types
//!
//! Per-item outcomes and the operation trait the executor drives.

use crate::entity::EntityKey;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

// ============================================================================
// Outcomes
// ============================================================================

/// Why a batch item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The chunk holding the item failed in transit
    Transport,
    /// The remote answered for the item and refused it
    Rejected,
    /// No returned result matched the item
    UnresolvedIdentity,
    /// The chunk's response could not be read
    Decode,
    /// Anything else
    Other,
}

/// Failure reason attached to one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl BatchFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The remote refused the item
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Rejected, message)
    }

    /// No result came back for `key`
    pub fn unresolved(key: &EntityKey) -> Self {
        Self::new(
            FailureKind::UnresolvedIdentity,
            Error::UnresolvedIdentity { key: key.clone() }.to_string(),
        )
    }

    /// Failure shared by every item of a failed chunk
    pub fn from_error(error: &Error) -> Self {
        let kind = match error {
            e if e.is_transport() => FailureKind::Transport,
            Error::UnresolvedIdentity { .. } => FailureKind::UnresolvedIdentity,
            Error::Decode { .. } | Error::JsonParse(_) => FailureKind::Decode,
            _ => FailureKind::Other,
        };
        Self::new(kind, error.to_string())
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Success or failure of one item
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    Success(V),
    Failure(BatchFailure),
}

impl<V> Outcome<V> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn success(&self) -> Option<&V> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&BatchFailure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    /// Convert into a `Result`, failures becoming [`Error::Other`]
    pub fn into_result(self) -> Result<V> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(failure) => Err(Error::Other(failure.to_string())),
        }
    }
}

/// One input of a batch call, tracked to its outcome
#[derive(Debug, Clone)]
pub struct BatchItem<T, V> {
    pub input: T,
    pub identity: EntityKey,
    pub outcome: Outcome<V>,
}

/// Every item of a batch call, in input order
#[derive(Debug, Clone)]
pub struct BatchReport<T, V> {
    pub items: Vec<BatchItem<T, V>>,
    /// Remote calls issued
    pub chunks: usize,
    /// Remote calls that failed as a whole
    pub failed_chunks: usize,
}

impl<T, V> BatchReport<T, V> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &BatchItem<T, V>> {
        self.items.iter().filter(|i| i.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItem<T, V>> {
        self.items.iter().filter(|i| i.outcome.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Whether every item succeeded
    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|i| i.outcome.is_success())
    }

    pub fn into_items(self) -> Vec<BatchItem<T, V>> {
        self.items
    }
}

// ============================================================================
// Operation Trait
// ============================================================================

/// A remote call that accepts many items at once
///
/// The executor splits inputs into chunks, calls [`BatchOperation::call`] once
/// per chunk and matches the returned keys back to the inputs. Results may
/// come back in any order and need not cover every input.
#[async_trait]
pub trait BatchOperation: Send + Sync {
    type Input: Send + Sync;
    type Output: Clone + Send;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Key the remote result for `input` will carry
    fn identity(&self, input: &Self::Input) -> EntityKey;

    /// Issue one remote call for `chunk`
    ///
    /// An `Err` fails every item of the chunk.
    async fn call(
        &self,
        chunk: &[&Self::Input],
    ) -> Result<Vec<(EntityKey, Outcome<Self::Output>)>>;
}
