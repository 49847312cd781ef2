//! Redirect module
//!
//! Follows redirect pages to the page they point at, recording the path.
//!
//! # Overview
//!
//! - `RedirectResolver` - walks a chain hop by hop with cycle detection and
//!   a step ceiling
//! - `PageLoader` - how the resolver fetches pages it knows too little about
//! - `RedirectPath` / `RedirectResolution` - the result

mod resolver;
mod types;

pub use resolver::{RedirectResolver, DEFAULT_MAX_STEPS};
pub use types::{PageLoader, RedirectPath, RedirectResolution};

#[cfg(test)]
mod tests;
