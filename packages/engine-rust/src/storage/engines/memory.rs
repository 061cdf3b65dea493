//! In-memory [`DocumentStore`] implementation backed by [`DashMap`].
//!
//! Serves the same index semantics as the persistent store through an
//! [`IndexCatalog`], and can inject faults (query errors per collection,
//! failing delete batches) so the engine's degradation and partial-failure
//! paths can be exercised without a real backend.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use sweep_core::{Document, DocumentRef, StoreQuery};

use crate::storage::error::StoreError;
use crate::storage::index::IndexCatalog;
use crate::traits::{DocumentStore, MAX_BATCH_SIZE};

use super::sort_and_limit;

/// Store access failure to raise on every query against a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFault {
    PermissionDenied,
    Unavailable,
    /// Report a missing composite index even for queries the catalog allows.
    IndexUnavailable,
}

impl StoreFault {
    fn to_error(&self, query: &StoreQuery) -> StoreError {
        match self {
            Self::PermissionDenied => StoreError::PermissionDenied {
                collection: query.collection.clone(),
                reason: "injected fault".to_string(),
            },
            Self::Unavailable => StoreError::Unavailable("injected fault".to_string()),
            Self::IndexUnavailable => StoreError::IndexUnavailable {
                collection: query.collection.clone(),
                fields: query.indexed_fields().iter().map(ToString::to_string).collect(),
                hint: None,
            },
        }
    }
}

/// In-memory document store keyed by collection, then document id.
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Document>>,
    catalog: IndexCatalog,
    max_batch_size: usize,
    query_faults: DashMap<String, StoreFault>,
    range_only_faults: DashMap<String, StoreFault>,
    failing_batches: Mutex<HashSet<usize>>,
    batch_attempts: AtomicUsize,
    committed: Mutex<Vec<Vec<DocumentRef>>>,
    queries: Mutex<Vec<StoreQuery>>,
}

impl MemoryStore {
    /// Creates an empty store with no composite indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(IndexCatalog::new())
    }

    #[must_use]
    pub fn with_catalog(catalog: IndexCatalog) -> Self {
        Self {
            collections: DashMap::new(),
            catalog,
            max_batch_size: MAX_BATCH_SIZE,
            query_faults: DashMap::new(),
            range_only_faults: DashMap::new(),
            failing_batches: Mutex::new(HashSet::new()),
            batch_attempts: AtomicUsize::new(0),
            committed: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the atomic batch ceiling.
    #[must_use]
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Insert or replace a document.
    pub fn insert(&self, collection: &str, doc: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc);
    }

    pub fn insert_all(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        for doc in docs {
            entry.insert(doc.id.clone(), doc);
        }
    }

    /// Number of documents currently in `collection`.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    #[must_use]
    pub fn contains(&self, doc_ref: &DocumentRef) -> bool {
        self.collections
            .get(&doc_ref.collection)
            .is_some_and(|c| c.contains_key(&doc_ref.id))
    }

    /// Make every query against `collection` fail with `fault`.
    pub fn fail_queries(&self, collection: &str, fault: StoreFault) {
        self.query_faults.insert(collection.to_string(), fault);
    }

    /// Make only range-only queries against `collection` fail with `fault`;
    /// compound queries still go through the index catalog.
    pub fn fail_range_only_queries(&self, collection: &str, fault: StoreFault) {
        self.range_only_faults.insert(collection.to_string(), fault);
    }

    /// Make the `attempt`-th delete batch (1-based, counted across the
    /// store's lifetime) fail without deleting anything.
    pub fn fail_batch(&self, attempt: usize) {
        self.failing_batches.lock().insert(attempt);
    }

    /// Sizes of the delete batches committed so far, in commit order.
    #[must_use]
    pub fn committed_batch_sizes(&self) -> Vec<usize> {
        self.committed.lock().iter().map(Vec::len).collect()
    }

    /// Number of delete batches attempted, including failed ones.
    #[must_use]
    pub fn batch_attempts(&self) -> usize {
        self.batch_attempts.load(Ordering::Relaxed)
    }

    /// Every query received so far, in order.
    #[must_use]
    pub fn query_log(&self) -> Vec<StoreQuery> {
        self.queries.lock().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<Document>, StoreError> {
        self.queries.lock().push(query.clone());

        if let Some(fault) = self.query_faults.get(&query.collection) {
            if *fault != StoreFault::IndexUnavailable || query.is_compound() {
                return Err(fault.to_error(query));
            }
        }
        if !query.is_compound() {
            if let Some(fault) = self.range_only_faults.get(&query.collection) {
                return Err(fault.to_error(query));
            }
        }
        self.catalog.check(query)?;

        let matched: Vec<Document> = self
            .collections
            .get(&query.collection)
            .map(|c| c.values().filter(|doc| query.matches(doc)).cloned().collect())
            .unwrap_or_default();

        Ok(sort_and_limit(matched, query))
    }

    async fn delete_batch(&self, refs: &[DocumentRef]) -> Result<(), StoreError> {
        let attempt = self.batch_attempts.fetch_add(1, Ordering::Relaxed) + 1;

        if refs.len() > self.max_batch_size {
            return Err(StoreError::BatchTooLarge {
                size: refs.len(),
                limit: self.max_batch_size,
            });
        }
        if self.failing_batches.lock().contains(&attempt) {
            return Err(StoreError::Unavailable(format!(
                "injected failure on batch {attempt}"
            )));
        }

        for doc_ref in refs {
            if let Some(mut collection) = self.collections.get_mut(&doc_ref.collection) {
                collection.remove(&doc_ref.id);
            }
        }
        self.committed.lock().push(refs.to_vec());
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sweep_core::{Condition, DateRange, QueryPlanner};

    use super::*;

    fn lead(id: &str, day: u32, source: &str) -> Document {
        Document::new(id)
            .with("createdAt", Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap())
            .with("source", source)
    }

    fn plan(condition: Option<&str>, limit: usize) -> sweep_core::QueryPlan {
        let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
        let cond = condition.map(|c| Condition::parse(c).unwrap());
        QueryPlanner::default().plan("leads", range, cond.as_ref(), limit)
    }

    #[tokio::test]
    async fn range_query_orders_by_timestamp_then_id() {
        let store = MemoryStore::new();
        store.insert_all(
            "leads",
            [lead("c", 3, "email"), lead("a", 5, "email"), lead("b", 3, "manual")],
        );

        let docs = store.query(&plan(None, 10).compound_query()).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn limit_is_applied_after_ordering() {
        let store = MemoryStore::new();
        store.insert_all("leads", (1..=9).map(|d| lead(&format!("l{d}"), d, "email")));

        let docs = store.query(&plan(None, 3).compound_query()).await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["l1", "l2", "l3"]);
    }

    #[tokio::test]
    async fn compound_query_without_index_fails() {
        let store = MemoryStore::new();
        store.insert("leads", lead("a", 2, "email"));

        let err = store
            .query(&plan(Some("source==email"), 10).compound_query())
            .await
            .unwrap_err();
        assert!(err.is_index_unavailable());
    }

    #[tokio::test]
    async fn compound_query_with_index_filters() {
        let store = MemoryStore::with_catalog(IndexCatalog::new().with("leads", "source"));
        store.insert_all("leads", [lead("a", 2, "email"), lead("b", 2, "manual")]);

        let docs = store
            .query(&plan(Some("source==email"), 10).compound_query())
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }

    #[tokio::test]
    async fn injected_index_fault_spares_range_only_queries() {
        let store = MemoryStore::with_catalog(IndexCatalog::new().with("leads", "source"));
        store.insert("leads", lead("a", 2, "email"));
        store.fail_queries("leads", StoreFault::IndexUnavailable);

        let plan = plan(Some("source==email"), 10);
        assert!(store.query(&plan.compound_query()).await.is_err());
        assert_eq!(store.query(&plan.range_only_query()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_batch_removes_documents() {
        let store = MemoryStore::new();
        store.insert_all("leads", [lead("a", 2, "email"), lead("b", 3, "email")]);

        let refs = vec![DocumentRef::new("leads", "a"), DocumentRef::new("leads", "gone")];
        store.delete_batch(&refs).await.unwrap();

        assert!(!store.contains(&DocumentRef::new("leads", "a")));
        assert!(store.contains(&DocumentRef::new("leads", "b")));
        assert_eq!(store.committed_batch_sizes(), vec![2]);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_atomically() {
        let store = MemoryStore::new().with_max_batch_size(2);
        store.insert_all("leads", [lead("a", 2, "email"), lead("b", 3, "email"), lead("c", 4, "email")]);

        let refs: Vec<DocumentRef> = ["a", "b", "c"]
            .iter()
            .map(|id| DocumentRef::new("leads", *id))
            .collect();
        let err = store.delete_batch(&refs).await.unwrap_err();

        assert!(matches!(err, StoreError::BatchTooLarge { size: 3, limit: 2 }));
        assert_eq!(store.len("leads"), 3);
    }

    #[tokio::test]
    async fn failing_batch_deletes_nothing() {
        let store = MemoryStore::new();
        store.insert("leads", lead("a", 2, "email"));
        store.fail_batch(1);

        let refs = vec![DocumentRef::new("leads", "a")];
        assert!(store.delete_batch(&refs).await.is_err());
        assert_eq!(store.len("leads"), 1);
        assert_eq!(store.batch_attempts(), 1);

        store.delete_batch(&refs).await.unwrap();
        assert_eq!(store.len("leads"), 0);
    }

    #[tokio::test]
    async fn permission_fault_is_raised_for_every_query() {
        let store = MemoryStore::new();
        store.fail_queries("leads", StoreFault::PermissionDenied);

        let err = store.query(&plan(None, 10).range_only_query()).await.unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
    }
}
