//! Batch operation executor

use super::types::{BatchFailure, BatchItem, BatchOperation, BatchReport, Outcome};
use crate::entity::{DefaultTitleNormalizer, EntityKey, TitleNormalizer};
use crate::error::{Error, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of items per remote call
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Splits inputs into chunks, runs them and reassembles per-item outcomes
///
/// The report always has one item per input, in input order. A chunk that
/// fails as a whole fails each of its items and nothing else.
#[derive(Clone)]
pub struct BatchExecutor {
    chunk_size: usize,
    concurrency: usize,
    normalizer: Arc<dyn TitleNormalizer>,
    cancel: CancellationToken,
}

impl BatchExecutor {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            concurrency: 1,
            normalizer: Arc::new(DefaultTitleNormalizer),
            cancel: CancellationToken::new(),
        }
    }

    /// Run up to `concurrency` chunks at once
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Normalize titles with `normalizer` before matching results
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn TitleNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Run `operation` over every input
    ///
    /// Returns [`Error::Cancelled`] if cancelled before all chunks finished;
    /// a partial report is never returned.
    pub async fn execute<O: BatchOperation>(
        &self,
        operation: &O,
        inputs: Vec<O::Input>,
    ) -> Result<BatchReport<O::Input, O::Output>> {
        let identities: Vec<EntityKey> = inputs
            .iter()
            .map(|input| self.normalize(&operation.identity(input)))
            .collect();

        let mut outcomes: Vec<Option<Outcome<O::Output>>> = vec![None; inputs.len()];

        // Inputs without identity never reach the remote
        let mut sendable = Vec::with_capacity(inputs.len());
        for (index, key) in identities.iter().enumerate() {
            if key.is_empty() {
                outcomes[index] = Some(Outcome::Failure(BatchFailure::unresolved(key)));
            } else {
                sendable.push(index);
            }
        }

        let chunks: Vec<Vec<usize>> = sendable
            .chunks(self.chunk_size)
            .map(<[usize]>::to_vec)
            .collect();
        let chunk_count = chunks.len();
        debug!(
            operation = operation.name(),
            items = inputs.len(),
            chunks = chunk_count,
            "Executing batch"
        );

        let inputs_ref = &inputs;
        let results: Vec<(Vec<usize>, Result<Vec<(EntityKey, Outcome<O::Output>)>>)> =
            stream::iter(chunks)
                .map(|indices| async move {
                    let chunk: Vec<&O::Input> = indices.iter().map(|&i| &inputs_ref[i]).collect();
                    let result = self.run_chunk(operation, &chunk).await;
                    (indices, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut failed_chunks = 0;
        for (indices, result) in results {
            match result {
                Ok(returned) => self.demultiplex(&indices, &identities, returned, &mut outcomes),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    failed_chunks += 1;
                    warn!(
                        operation = operation.name(),
                        items = indices.len(),
                        error = %e,
                        "Batch chunk failed"
                    );
                    let failure = BatchFailure::from_error(&e);
                    for &index in &indices {
                        outcomes[index] = Some(Outcome::Failure(failure.clone()));
                    }
                }
            }
        }

        let items: Vec<BatchItem<O::Input, O::Output>> = inputs
            .into_iter()
            .zip(identities)
            .zip(outcomes)
            .map(|((input, identity), outcome)| {
                let outcome = outcome
                    .unwrap_or_else(|| Outcome::Failure(BatchFailure::unresolved(&identity)));
                BatchItem {
                    input,
                    identity,
                    outcome,
                }
            })
            .collect();

        let report = BatchReport {
            items,
            chunks: chunk_count,
            failed_chunks,
        };
        info!(
            operation = operation.name(),
            items = report.len(),
            failures = report.failure_count(),
            failed_chunks,
            "Batch complete"
        );
        Ok(report)
    }

    async fn run_chunk<O: BatchOperation>(
        &self,
        operation: &O,
        chunk: &[&O::Input],
    ) -> Result<Vec<(EntityKey, Outcome<O::Output>)>> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = operation.call(chunk) => result,
        }
    }

    /// Match returned results to the chunk's inputs by identity
    fn demultiplex<V: Clone>(
        &self,
        indices: &[usize],
        identities: &[EntityKey],
        returned: Vec<(EntityKey, Outcome<V>)>,
        outcomes: &mut [Option<Outcome<V>>],
    ) {
        let returned: Vec<(EntityKey, Outcome<V>)> = returned
            .into_iter()
            .map(|(key, outcome)| (self.normalize(&key), outcome))
            .collect();

        let mut by_id: HashMap<i64, usize> = HashMap::new();
        let mut by_title: HashMap<&str, usize> = HashMap::new();
        for (position, (key, _)) in returned.iter().enumerate() {
            if let Some(id) = key.id {
                by_id.entry(id).or_insert(position);
            }
            if let Some(title) = key.title.as_deref() {
                by_title.entry(title).or_insert(position);
            }
        }

        for &index in indices {
            let key = &identities[index];
            let by_key_id = key.id.and_then(|id| by_id.get(&id)).copied();
            let by_key_title = || {
                key.title
                    .as_deref()
                    .and_then(|t| by_title.get(t))
                    .copied()
                    .filter(|&p| returned[p].0.matches(key))
            };
            outcomes[index] = Some(match by_key_id.or_else(by_key_title) {
                Some(position) => returned[position].1.clone(),
                None => Outcome::Failure(BatchFailure::unresolved(key)),
            });
        }
    }

    fn normalize(&self, key: &EntityKey) -> EntityKey {
        EntityKey::new(
            key.id,
            key.title.as_deref().map(|t| self.normalizer.normalize(t)),
            key.namespace,
        )
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("chunk_size", &self.chunk_size)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
