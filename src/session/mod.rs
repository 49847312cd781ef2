//! Session module
//!
//! The session-scoped context every operation runs against.
//!
//! # Overview
//!
//! A [`Session`] owns one transport, one identity registry and one
//! configuration. Independent sessions share nothing, so parallel sessions
//! (tests, for instance) never see each other's pages.
//!
//! - [`Session::enumerate`] drives a generator lazily, yielding canonical pages
//! - [`Session::resolve`] and [`Session::page`] look up or create pages
//! - [`Session::resolve_redirect`] follows redirect chains
//! - [`Session::execute`] runs any batch operation, with [`Session::refresh`],
//!   [`Session::purge`] and [`Session::fetch_revisions`] on top
//!
//! [`Session::close`] cancels everything in flight and clears the registry.

mod enumeration;
mod types;

pub use enumeration::{Enumeration, RevisionStream};
pub use types::SessionStats;

use crate::batch::{
    BatchExecutor, BatchFailure, BatchItem, BatchOperation, BatchReport, FailureKind,
    FetchedRevision, Outcome, PurgeOperation, PurgeOptions, RefreshOperation, RefreshOptions,
    RevisionFetch,
};
use crate::config::SessionConfig;
use crate::entity::{
    DefaultTitleNormalizer, EntityKey, FieldMapping, MediaWikiFieldMapping, Page, Registry,
    TitleNormalizer,
};
use crate::error::{Error, Result};
use crate::generators::{Generator, Revisions};
use crate::http::HttpClient;
use crate::pagination::SequenceDriver;
use crate::redirect::{PageLoader, RedirectResolution, RedirectResolver};
use crate::transport::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Session-scoped client context
pub struct Session {
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
    mapping: Arc<dyn FieldMapping>,
    normalizer: Arc<dyn TitleNormalizer>,
    config: SessionConfig,
    cancel: CancellationToken,
    stats: Arc<Mutex<SessionStats>>,
}

impl Session {
    /// Create a session over an existing transport
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let normalizer: Arc<dyn TitleNormalizer> = Arc::new(DefaultTitleNormalizer);
        Self {
            transport,
            registry: Arc::new(Registry::with_normalizer(normalizer.clone())),
            mapping: Arc::new(MediaWikiFieldMapping),
            normalizer,
            config,
            cancel: CancellationToken::new(),
            stats: Arc::new(Mutex::new(SessionStats::new())),
        }
    }

    /// Create a session talking HTTP to `config.api_url`
    pub fn connect(config: SessionConfig) -> Result<Self> {
        if config.api_url.is_empty() {
            return Err(Error::config("api_url is required"));
        }
        config.validate()?;
        let client = HttpClient::with_config(config.http_client_config())?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Use `mapping` to turn raw items into page fragments
    #[must_use]
    pub fn with_mapping(mut self, mapping: Arc<dyn FieldMapping>) -> Self {
        self.mapping = mapping;
        self
    }

    /// Use `normalizer` for titles
    ///
    /// Replaces the registry, so it must be called before any page is looked up.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn TitleNormalizer>) -> Self {
        self.registry = Arc::new(Registry::with_normalizer(normalizer.clone()));
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Counters so far
    pub fn stats(&self) -> SessionStats {
        self.stats.lock().clone()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Canonical page for `key`, created unfetched if unknown
    pub fn resolve(&self, key: &EntityKey) -> Result<Page> {
        self.ensure_open()?;
        self.registry.resolve(key)
    }

    /// Canonical page titled `title`
    pub fn page(&self, title: &str) -> Result<Page> {
        self.resolve(&EntityKey::by_title(title))
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Lazily enumerate every page `generator` selects
    ///
    /// Fails before any round-trip if the generator's request is invalid.
    pub fn enumerate<G: Generator + 'static>(&self, generator: G) -> Result<Enumeration> {
        self.ensure_open()?;
        let driver = SequenceDriver::new(
            self.transport.clone(),
            Arc::new(generator),
            self.config.effective_page_size(),
        )?
        .with_cancellation(self.cancel.child_token());
        debug!(generator = driver.generator_name(), "Starting enumeration");
        self.stats.lock().add_enumeration();
        Ok(Enumeration::new(
            driver,
            self.registry.clone(),
            self.mapping.clone(),
            self.stats.clone(),
        ))
    }

    /// Lazily enumerate one page's revisions
    pub fn revisions(&self, query: Revisions) -> Result<RevisionStream> {
        Ok(RevisionStream::new(self.enumerate(query)?))
    }

    // ========================================================================
    // Redirects
    // ========================================================================

    /// Follow redirects from `start` to the first page that is not one
    ///
    /// Hops the registry already knows cost nothing; unknown ones are fetched.
    pub async fn resolve_redirect(&self, start: &Page) -> Result<RedirectResolution> {
        self.ensure_open()?;
        let resolver = RedirectResolver::new(self.config.max_redirect_steps);
        let resolution = resolver.resolve(self, &self.registry, start).await?;
        if !resolution.is_direct() {
            self.stats.lock().add_redirect();
        }
        Ok(resolution)
    }

    // ========================================================================
    // Batch
    // ========================================================================

    /// Run `operation` over `inputs` in chunks of `batch_chunk_size`
    pub async fn execute<O: BatchOperation>(
        &self,
        operation: &O,
        inputs: Vec<O::Input>,
    ) -> Result<BatchReport<O::Input, O::Output>> {
        self.ensure_open()?;
        let report = self.executor().execute(operation, inputs).await?;
        self.stats
            .lock()
            .add_batch(report.chunks, report.failed_chunks, report.failure_count());
        Ok(report)
    }

    /// Fetch page info for every page, merging it into the registry
    pub async fn refresh(
        &self,
        pages: Vec<Page>,
        options: RefreshOptions,
    ) -> Result<BatchReport<Page, Page>> {
        let operation = RefreshOperation::new(
            self.transport.clone(),
            self.registry.clone(),
            self.mapping.clone(),
            options,
        );
        self.execute(&operation, pages).await
    }

    /// Refresh a single page
    pub async fn refresh_page(&self, page: &Page, options: RefreshOptions) -> Result<Page> {
        let report = self.refresh(vec![page.clone()], options).await?;
        let (identity, outcome) = single(report)?;
        match outcome {
            Outcome::Success(page) => Ok(page),
            Outcome::Failure(failure) => Err(failure_error(identity, failure)),
        }
    }

    /// Purge the server-side cache of every page
    pub async fn purge(
        &self,
        pages: Vec<Page>,
        options: PurgeOptions,
    ) -> Result<BatchReport<Page, ()>> {
        let operation = PurgeOperation::new(self.transport.clone(), options);
        self.execute(&operation, pages).await
    }

    /// Purge a single page; `false` if the server refused it
    pub async fn purge_page(&self, page: &Page) -> Result<bool> {
        let report = self.purge(vec![page.clone()], PurgeOptions::default()).await?;
        let (identity, outcome) = single(report)?;
        match outcome {
            Outcome::Success(()) => Ok(true),
            Outcome::Failure(failure) if failure.kind == FailureKind::Rejected => Ok(false),
            Outcome::Failure(failure) => Err(failure_error(identity, failure)),
        }
    }

    /// Fetch revisions by id, in request order
    pub async fn fetch_revisions(
        &self,
        ids: Vec<i64>,
    ) -> Result<BatchReport<i64, FetchedRevision>> {
        let operation =
            RevisionFetch::new(self.transport.clone(), self.registry.clone(), self.mapping.clone());
        self.execute(&operation, ids).await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Cancel in-flight work and forget every page
    ///
    /// Pages still held elsewhere keep their last state but are no longer
    /// canonical for anything.
    pub fn close(&self) {
        self.cancel.cancel();
        self.registry.clear();
        debug!("Session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    fn executor(&self) -> BatchExecutor {
        BatchExecutor::new(self.config.batch_chunk_size)
            .with_concurrency(self.config.batch_concurrency)
            .with_normalizer(self.normalizer.clone())
            .with_cancellation(self.cancel.child_token())
    }
}

#[async_trait]
impl PageLoader for Session {
    async fn load(&self, page: &Page) -> Result<Page> {
        let options = RefreshOptions {
            fetch_content: false,
            resolve_redirects: true,
        };
        self.refresh_page(page, options).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api_url", &self.config.api_url)
            .field("pages", &self.registry.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// The only item of a one-item batch
fn single<T, V>(report: BatchReport<T, V>) -> Result<(EntityKey, Outcome<V>)> {
    report
        .into_items()
        .into_iter()
        .next()
        .map(|BatchItem { identity, outcome, .. }| (identity, outcome))
        .ok_or_else(|| Error::Other("batch returned no items".to_string()))
}

fn failure_error(identity: EntityKey, failure: BatchFailure) -> Error {
    match failure.kind {
        FailureKind::UnresolvedIdentity => Error::UnresolvedIdentity { key: identity },
        FailureKind::Decode => Error::decode(failure.message),
        _ => Error::Other(failure.to_string()),
    }
}
