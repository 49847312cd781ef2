//! Redirect resolver

use super::types::{PageLoader, RedirectPath, RedirectResolution};
use crate::entity::{Page, Registry};
use crate::error::{Error, Result};
use tracing::debug;

/// Default ceiling on followed redirects
pub const DEFAULT_MAX_STEPS: usize = 20;

/// Follows redirect chains with cycle detection and a hard step limit
#[derive(Debug, Clone, Copy)]
pub struct RedirectResolver {
    max_steps: usize,
}

impl RedirectResolver {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Follow redirects from `start` until a page that is not a redirect
    ///
    /// Pages whose redirect status or target is unknown are loaded through
    /// `loader`; everything already merged is used as is. A page seen twice
    /// fails with [`Error::CircularRedirect`] and a chain longer than the
    /// step limit with [`Error::StepLimitExceeded`].
    pub async fn resolve(
        &self,
        loader: &dyn PageLoader,
        registry: &Registry,
        start: &Page,
    ) -> Result<RedirectResolution> {
        let mut path = RedirectPath::new();
        let mut visited: Vec<Page> = Vec::new();
        let mut current = start.canonical();

        loop {
            if needs_load(&current) {
                current = loader.load(&current).await?;
            }

            if current.is_redirect() != Some(true) {
                debug!(start = %start, target = %current, hops = path.len(), "Resolved redirect chain");
                return Ok(RedirectResolution {
                    target: current,
                    path,
                });
            }

            let key = registry.normalize_key(&current.key());
            let seen = visited.iter().any(|page| {
                page.same(&current) || registry.normalize_key(&page.key()).matches(&key)
            });
            if seen {
                let mut cycle = path.titles();
                cycle.push(key.to_string());
                return Err(Error::CircularRedirect { path: cycle });
            }

            if path.len() >= self.max_steps {
                let mut chain = path.titles();
                chain.push(key.to_string());
                return Err(Error::StepLimitExceeded {
                    limit: self.max_steps,
                    path: chain,
                });
            }

            let target = current.redirect_target().ok_or_else(|| {
                Error::decode(format!("{key} is a redirect but its target is unknown"))
            })?;

            path.push(current.key());
            visited.push(current.clone());
            current = registry.resolve(&target)?;
        }
    }
}

impl Default for RedirectResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

fn needs_load(page: &Page) -> bool {
    match page.is_redirect() {
        None => true,
        Some(true) => page.redirect_target().is_none(),
        Some(false) => !page.is_fetched(),
    }
}
