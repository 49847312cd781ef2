//! Generators module
//!
//! Request builders for every kind of enumeration the session can drive.
//!
//! # Overview
//!
//! A [`Generator`] builds the first request of an enumeration and extracts
//! raw page items from each response. The pagination driver is generic over
//! it and handles continuation. [`QueryDescriptor`] wraps every variant in one
//! serializable enum so enumerations can be described as plain data.
//!
//! # Example
//!
//! ```
//! use wikiclient::generators::{Generator, Search};
//!
//! let params = Search::new("rust").namespaces([0, 4]).build_request(20).unwrap();
//! assert_eq!(params["gsrnamespace"], "0|4");
//! ```

mod lists;
mod revisions;
mod types;

pub use lists::{AllPages, Backlinks, CategoryMembers, QueryPage, Search, TranscludedIn};
pub use revisions::Revisions;
pub use types::{query_pages, Generator, QueryDescriptor};

#[cfg(test)]
mod tests;
