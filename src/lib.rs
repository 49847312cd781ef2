// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # wikiclient
//!
//! Client-side access layer for paginated MediaWiki-style APIs.
//!
//! ## Features
//!
//! - **Lazy enumeration**: continuation-driven sequences that only request a
//!   page when the consumer pulls past the buffered items
//! - **Page identity**: one canonical [`entity::Page`] per remote page,
//!   whether it was reached by id, by title or by both
//! - **Redirects**: chain following with cycle detection and a step limit
//! - **Bulk operations**: chunked purge, refresh and revision fetches with a
//!   per-item outcome for every input
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wikiclient::generators::Search;
//! use wikiclient::{Session, SessionConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::connect(SessionConfig::new("https://en.wikipedia.org/w/api.php"))?;
//!
//!     let mut results = session.enumerate(Search::new("borrow checker"))?;
//!     while let Some(page) = results.next().await? {
//!         println!("{page}");
//!     }
//!
//!     let start = session.page("Foo")?;
//!     let resolution = session.resolve_redirect(&start).await?;
//!     println!("{} via {}", resolution.target, resolution.path);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            Session                               │
//! │  enumerate()   resolve()   resolve_redirect()   execute()        │
//! └──────────────────────────────────────────────────────────────────┘
//!        │               │                │                 │
//! ┌──────┴──────┬────────┴────────┬───────┴───────┬─────────┴───────┐
//! │ Pagination  │     Entity      │   Redirect    │      Batch      │
//! ├─────────────┼─────────────────┼───────────────┼─────────────────┤
//! │ Cursor      │ Registry        │ Resolver      │ Executor        │
//! │ Driver      │ Merge           │ Cycle check   │ Purge/Refresh   │
//! │ Generators  │ Field mapping   │ Step limit    │ Revisions       │
//! └─────────────┴─────────────────┴───────────────┴─────────────────┘
//!                                │
//!                 Transport (HTTP: retry, backoff, rate limit)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Session configuration
pub mod config;

/// Transport trait consumed by every remote operation
pub mod transport;

/// HTTP transport with retry and rate limiting
pub mod http;

/// Continuation cursor and lazy sequence driver
pub mod pagination;

/// Query generators
pub mod generators;

/// Pages, identity registry and merge layer
pub mod entity;

/// Redirect chain resolution
pub mod redirect;

/// Chunked bulk operations
pub mod batch;

/// Session-scoped context
pub mod session;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::SessionConfig;
pub use entity::{EntityKey, Page};
pub use session::Session;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
