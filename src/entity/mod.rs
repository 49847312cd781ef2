//! Entity module
//!
//! Pages, their identity and how fetched data flows into them.
//!
//! # Overview
//!
//! The entity module provides:
//! - `EntityKey` - numeric id and/or title identifying a remote page
//! - `Page` - shared handle to the single canonical entity of a page
//! - `PageFragment` + `apply_fragment` - field-level, idempotent merging
//! - `FieldMapping` / `TitleNormalizer` - collaborator seams with MediaWiki defaults
//! - `Registry` - one canonical `Page` per remote identity per session

mod mapping;
mod merge;
mod registry;
mod types;

pub use mapping::{
    flag, parse_redirect_target, parse_revision, parse_timestamp, DefaultTitleNormalizer,
    FieldMapping, MediaWikiFieldMapping, TitleNormalizer,
};
pub use merge::{apply_fragment, PageFragment};
pub use registry::Registry;
pub use types::{EntityKey, Page, PageState, Revision};
