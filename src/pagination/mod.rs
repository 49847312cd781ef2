//! Pagination module
//!
//! Continuation-based enumeration of remote result sets.
//!
//! # Overview
//!
//! The remote returns large result sets in bounded pages, each one carrying
//! an opaque `continue` object that must be sent back to get the next page.
//! [`ContinuationCursor`] holds that token and the exhaustion flag, and
//! [`SequenceDriver`] turns the round-trips into one lazy sequence of raw
//! items:
//!
//! - pull-based: a page is fetched only when the previous one is consumed
//! - page sizes are a hint; short, long and empty pages are all handled
//! - no round-trip after exhaustion or after cancellation
//! - a failed round-trip is returned to the consumer, never turned into an
//!   early end of the sequence

mod driver;
mod types;

pub use driver::{advance, SequenceDriver};
pub use types::{ContinuationCursor, CursorState};

#[cfg(test)]
mod tests;
