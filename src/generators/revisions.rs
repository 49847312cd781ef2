//! Revision history generator
//!
//! Enumerates the revisions of a single page. Each raw item is the page entry
//! carrying exactly one revision, so the merge layer folds a history that
//! spans many continuation rounds into one page.

use super::types::{query_pages, Generator};
use crate::error::{Error, Result};
use crate::types::{JsonValue, OptionStringExt, Params, RawItem, SortDirection};
use serde::{Deserialize, Serialize};

/// Remote ceiling on revisions per request when content is included
const MAX_CONTENT_LIMIT: u32 = 50;

const BASE_PROPS: &str = "ids|timestamp|user|comment|size|flags";

/// Revisions of one page, newest first unless `direction` is `newer`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revisions {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page_id: Option<i64>,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub start_id: Option<i64>,
    #[serde(default)]
    pub end_id: Option<i64>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub exclude_user: Option<String>,
    #[serde(default)]
    pub fetch_content: bool,
}

impl Revisions {
    /// History of the page with this title
    pub fn of_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// History of the page with this id
    pub fn of_page_id(id: i64) -> Self {
        Self {
            page_id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Restrict to revision ids between `start` and `end` (inclusive)
    #[must_use]
    pub fn range(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.start_id = start;
        self.end_id = end;
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn exclude_user(mut self, user: impl Into<String>) -> Self {
        self.exclude_user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_content(mut self) -> Self {
        self.fetch_content = true;
        self
    }

    fn validate(&self) -> Result<()> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        match (title, self.page_id) {
            (None, None) => {
                return Err(Error::invalid_request(
                    "revisions need a page title or page id",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::invalid_request(
                    "revisions take either a page title or a page id, not both",
                ))
            }
            _ => {}
        }

        if self.user.clone().none_if_blank().is_some()
            && self.exclude_user.clone().none_if_blank().is_some()
        {
            return Err(Error::invalid_request(
                "user and exclude_user cannot be combined",
            ));
        }

        if let (Some(start), Some(end)) = (self.start_id, self.end_id) {
            let ordered = match self.direction {
                SortDirection::Older => start >= end,
                SortDirection::Newer => start <= end,
            };
            if !ordered {
                return Err(Error::invalid_request(format!(
                    "start id {start} and end id {end} are out of order for direction '{}'",
                    self.direction.as_str()
                )));
            }
        }
        Ok(())
    }
}

impl Generator for Revisions {
    fn name(&self) -> &'static str {
        "revisions"
    }

    fn build_request(&self, page_size: u32) -> Result<Params> {
        self.validate()?;

        let mut params = Params::new();
        params.insert("action".into(), "query".into());
        params.insert("prop".into(), "revisions".into());
        match (&self.title, self.page_id) {
            (_, Some(id)) => params.insert("pageids".into(), id.to_string()),
            (Some(title), None) => params.insert("titles".into(), title.trim().to_string()),
            (None, None) => None,
        };

        let limit = if self.fetch_content {
            params.insert("rvprop".into(), format!("{BASE_PROPS}|content"));
            params.insert("rvslots".into(), "main".into());
            page_size.min(MAX_CONTENT_LIMIT)
        } else {
            params.insert("rvprop".into(), BASE_PROPS.into());
            page_size
        };
        params.insert("rvlimit".into(), limit.to_string());
        params.insert("rvdir".into(), self.direction.as_str().into());

        if let Some(start) = self.start_id {
            params.insert("rvstartid".into(), start.to_string());
        }
        if let Some(end) = self.end_id {
            params.insert("rvendid".into(), end.to_string());
        }
        if let Some(user) = self.user.clone().none_if_blank() {
            params.insert("rvuser".into(), user);
        }
        if let Some(user) = self.exclude_user.clone().none_if_blank() {
            params.insert("rvexcludeuser".into(), user);
        }
        Ok(params)
    }

    fn parse_page(&self, response: &JsonValue) -> Result<Vec<RawItem>> {
        let mut items = Vec::new();
        for mut page in query_pages(response)? {
            let revisions = match page.remove("revisions") {
                Some(JsonValue::Array(list)) => list,
                Some(other) => {
                    return Err(Error::decode(format!(
                        "revisions must be a list, got {other}"
                    )))
                }
                // A missing page surfaces once, without revisions
                None => {
                    items.push(page);
                    continue;
                }
            };
            for revision in revisions {
                let mut item = page.clone();
                item.insert("revisions".into(), JsonValue::Array(vec![revision]));
                items.push(item);
            }
        }
        Ok(items)
    }
}
