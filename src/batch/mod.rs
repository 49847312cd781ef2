//! Batch module
//!
//! Bulk operations with per-item success and failure.
//!
//! # Overview
//!
//! [`BatchExecutor`] splits an input collection into chunks no larger than the
//! remote accepts, issues one call per chunk through a [`BatchOperation`] and
//! matches the returned results back to the inputs by identity, since the
//! remote does not keep request order. Every input yields exactly one
//! [`BatchItem`]:
//!
//! - inputs the remote answered for get its answer
//! - inputs nothing matched fail as unresolved
//! - every input of a chunk that failed in transit fails with that error
//!
//! Concrete operations: [`PurgeOperation`], [`RefreshOperation`] and
//! [`RevisionFetch`].

mod executor;
mod operations;
mod types;

pub use executor::{BatchExecutor, DEFAULT_CHUNK_SIZE};
pub use operations::{
    FetchedRevision, PurgeOperation, PurgeOptions, RefreshOperation, RefreshOptions,
    RevisionFetch,
};
pub use types::{BatchFailure, BatchItem, BatchOperation, BatchReport, FailureKind, Outcome};
