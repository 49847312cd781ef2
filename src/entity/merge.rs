//! Entity merge layer
//!
//! A [`PageFragment`] is whatever one response told us about one page.
//! Fragments arriving over several continuation rounds are folded into the
//! same [`PageState`] field by field.

use super::types::{overwrite, EntityKey, PageState, Revision};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Partial page data extracted from one raw item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFragment {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub namespace: Option<i32>,
    pub exists: Option<bool>,
    pub is_redirect: Option<bool>,
    pub content: Option<String>,
    pub content_length: Option<u64>,
    pub last_revision_id: Option<i64>,
    pub touched: Option<DateTime<Utc>>,
    pub redirect_target: Option<EntityKey>,
    pub revisions: Vec<Revision>,
}

impl PageFragment {
    /// Fragment that replays everything a state knows
    pub fn from_state(state: &PageState) -> Self {
        Self {
            id: state.key.id,
            title: state.key.title.clone(),
            namespace: (state.key.namespace != 0).then_some(state.key.namespace),
            exists: state.exists,
            is_redirect: state.is_redirect,
            content: state.content.clone(),
            content_length: state.content_length,
            last_revision_id: state.last_revision_id,
            touched: state.touched,
            redirect_target: state.redirect_target.clone(),
            revisions: state.revisions.clone(),
        }
    }

    /// Identity carried by the fragment
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.id, self.title.clone(), self.namespace.unwrap_or(0))
    }

    /// Names of fields whose known value differs from `state`
    ///
    /// Fields unknown on either side never conflict.
    pub fn conflicts_with(&self, state: &PageState) -> Vec<&'static str> {
        fn differs<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
            matches!((a, b), (Some(x), Some(y)) if x != y)
        }

        let mut fields = Vec::new();
        if differs(&self.id, &state.key.id) {
            fields.push("id");
        }
        if differs(&self.exists, &state.exists) {
            fields.push("exists");
        }
        if differs(&self.is_redirect, &state.is_redirect) {
            fields.push("is_redirect");
        }
        if differs(&self.content, &state.content) {
            fields.push("content");
        }
        if differs(&self.last_revision_id, &state.last_revision_id) {
            fields.push("last_revision_id");
        }
        if differs(&self.redirect_target, &state.redirect_target) {
            fields.push("redirect_target");
        }
        fields
    }
}

/// Apply `fragment` to `state` in place; returns whether anything changed
///
/// Known fields overwrite, unknown fields are left alone, so applying the
/// same fragment twice is the same as applying it once. A fragment naming a
/// different page id than the state already holds is rejected before any
/// field is touched.
pub fn apply_fragment(state: &mut PageState, fragment: &PageFragment) -> Result<bool> {
    if let (Some(known), Some(incoming)) = (state.key.id, fragment.id) {
        if known != incoming {
            return Err(Error::identity_conflict(
                state.key.clone(),
                format!("fragment carries page id {incoming}, entity already has {known}"),
            ));
        }
    }

    let mut changed = false;
    changed |= overwrite(&mut state.key.id, &fragment.id);
    changed |= overwrite(&mut state.key.title, &fragment.title);
    if let Some(ns) = fragment.namespace {
        if state.key.namespace != ns {
            state.key.namespace = ns;
            changed = true;
        }
    }
    changed |= overwrite(&mut state.exists, &fragment.exists);
    changed |= overwrite(&mut state.is_redirect, &fragment.is_redirect);
    changed |= overwrite(&mut state.content, &fragment.content);
    changed |= overwrite(&mut state.content_length, &fragment.content_length);
    changed |= overwrite(&mut state.last_revision_id, &fragment.last_revision_id);
    changed |= overwrite(&mut state.touched, &fragment.touched);
    changed |= overwrite(&mut state.redirect_target, &fragment.redirect_target);

    for revision in &fragment.revisions {
        match state
            .revisions
            .binary_search_by_key(&revision.id, |r| r.id)
        {
            Ok(pos) => changed |= state.revisions[pos].absorb(revision),
            Err(pos) => {
                state.revisions.insert(pos, revision.clone());
                changed = true;
            }
        }
    }

    if changed {
        state.version += 1;
    }
    Ok(changed)
}
