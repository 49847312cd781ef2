//! CLI module
//!
//! Command-line front end over [`crate::session::Session`].
//!
//! # Commands
//!
//! - `search` - Full-text search
//! - `list` - Enumerate pages selected by a query descriptor
//! - `revisions` - Revision history of a page
//! - `redirect` - Follow a redirect chain
//! - `purge` - Purge the server-side cache of pages

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
