use async_trait::async_trait;
use sweep_core::{Document, DocumentRef, StoreQuery};

use crate::storage::StoreError;

/// Largest number of documents a single atomic delete batch may carry.
pub const MAX_BATCH_SIZE: usize = 500;

/// Collection-oriented document store the engine reads from and deletes in.
/// Implementations: `redb` (persistent), memory (tests).
///
/// Passed around as `Arc<dyn DocumentStore>`; the engine never holds a
/// global handle.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Run a range query, optionally combined with one extra filter.
    ///
    /// Results are ordered by the range field ascending, then by id, and
    /// truncated to `query.limit` when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IndexUnavailable`] when `query` combines the
    /// range with a field that has no composite index. Any other variant
    /// means the store could not be read.
    async fn query(&self, query: &StoreQuery) -> Result<Vec<Document>, StoreError>;

    /// Delete every referenced document in one atomic batch.
    ///
    /// References to documents that no longer exist are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BatchTooLarge`] when `refs` exceeds
    /// [`max_batch_size`](DocumentStore::max_batch_size); on any error no
    /// document in the batch was deleted.
    async fn delete_batch(&self, refs: &[DocumentRef]) -> Result<(), StoreError>;

    /// Upper bound on the size of one delete batch.
    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}
