//! Sequential chunked deletion.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sweep_core::DocumentRef;

use crate::traits::DocumentStore;

/// Outcome of deleting one collection's matches (or, summed, a whole run).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed_chunks: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Adds another result's counts and errors to this one.
    pub fn absorb(&mut self, other: &BatchResult) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed_chunks += other.failed_chunks;
        self.errors.extend(other.errors.iter().cloned());
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_chunks == 0 && self.succeeded == self.attempted
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} deleted", self.succeeded, self.attempted)?;
        if self.failed_chunks > 0 {
            write!(f, ", {} chunk(s) failed", self.failed_chunks)?;
        }
        Ok(())
    }
}

/// Deletes document references in consecutive chunks, one atomic batch at a
/// time. A failed chunk is counted and skipped; later chunks still run.
pub struct BatchMutator {
    store: Arc<dyn DocumentStore>,
    chunk_size: usize,
}

impl BatchMutator {
    /// `chunk_size` is clamped to `1..=store.max_batch_size()`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.clamp(1, store.max_batch_size().max(1));
        Self { store, chunk_size }
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn delete(&self, refs: &[DocumentRef]) -> BatchResult {
        let mut result = BatchResult {
            attempted: refs.len(),
            ..BatchResult::default()
        };

        for (chunk, batch) in refs.chunks(self.chunk_size).enumerate() {
            match self.store.delete_batch(batch).await {
                Ok(()) => {
                    result.succeeded += batch.len();
                    tracing::debug!(
                        store = self.store.name(),
                        chunk,
                        size = batch.len(),
                        succeeded = result.succeeded,
                        "delete batch committed"
                    );
                }
                Err(err) => {
                    result.failed_chunks += 1;
                    tracing::warn!(
                        store = self.store.name(),
                        chunk,
                        size = batch.len(),
                        error = %err,
                        "delete batch failed"
                    );
                    result.errors.push(format!("chunk {chunk}: {err}"));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sweep_core::Document;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::traits::MAX_BATCH_SIZE;

    fn seeded(n: usize) -> (Arc<MemoryStore>, Vec<DocumentRef>) {
        seeded_in(MemoryStore::new(), n)
    }

    fn seeded_in(store: MemoryStore, n: usize) -> (Arc<MemoryStore>, Vec<DocumentRef>) {
        let store = Arc::new(store);
        store.insert_all("notes", (0..n).map(|i| Document::new(format!("n{i:05}"))));
        let refs = (0..n)
            .map(|i| DocumentRef::new("notes", format!("n{i:05}")))
            .collect();
        (store, refs)
    }

    #[tokio::test]
    async fn chunks_are_committed_in_order() {
        let (store, refs) = seeded(1200);
        let result = BatchMutator::new(store.clone(), MAX_BATCH_SIZE).delete(&refs).await;

        assert_eq!(store.committed_batch_sizes(), vec![500, 500, 200]);
        assert_eq!(result.succeeded, 1200);
        assert!(result.is_complete());
        assert_eq!(store.len("notes"), 0);
    }

    #[tokio::test]
    async fn failed_chunk_does_not_stop_later_chunks() {
        let (store, refs) = seeded(25);
        store.fail_batch(2);
        let result = BatchMutator::new(store.clone(), 10).delete(&refs).await;

        assert_eq!(result.attempted, 25);
        assert_eq!(result.succeeded, 15);
        assert_eq!(result.failed_chunks, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("chunk 1:"));
        assert_eq!(store.batch_attempts(), 3);
        assert_eq!(store.len("notes"), 10);
        assert_eq!(result.to_string(), "15/25 deleted, 1 chunk(s) failed");
    }

    #[tokio::test]
    async fn chunk_size_is_clamped_to_store_ceiling() {
        let (store, refs) = seeded_in(MemoryStore::new().with_max_batch_size(3), 7);
        let mutator = BatchMutator::new(store.clone(), 500);
        assert_eq!(mutator.chunk_size(), 3);

        let result = mutator.delete(&refs).await;
        assert_eq!(store.committed_batch_sizes(), vec![3, 3, 1]);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn empty_input_commits_nothing() {
        let (store, _) = seeded(0);
        let result = BatchMutator::new(store.clone(), 0).delete(&[]).await;
        assert_eq!(result, BatchResult::default());
        assert_eq!(store.batch_attempts(), 0);
    }

    #[test]
    fn absorb_sums_counts() {
        let mut total = BatchResult::default();
        total.absorb(&BatchResult {
            attempted: 3,
            succeeded: 3,
            failed_chunks: 0,
            errors: vec![],
        });
        total.absorb(&BatchResult {
            attempted: 4,
            succeeded: 2,
            failed_chunks: 1,
            errors: vec!["chunk 0: down".into()],
        });
        assert_eq!(total.attempted, 7);
        assert_eq!(total.succeeded, 5);
        assert_eq!(total.failed_chunks, 1);
        assert!(!total.is_complete());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn commit_count_is_ceiling_of_n_over_chunk(n in 0usize..1600) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (store, refs) = seeded(n);
            let result = rt.block_on(BatchMutator::new(store.clone(), MAX_BATCH_SIZE).delete(&refs));

            let sizes = store.committed_batch_sizes();
            prop_assert_eq!(sizes.len(), n.div_ceil(MAX_BATCH_SIZE));
            prop_assert!(sizes.iter().all(|s| *s <= MAX_BATCH_SIZE));
            prop_assert_eq!(result.succeeded, n);
        }
    }
}
