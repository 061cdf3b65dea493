//! Plan execution with a one-shot fallback for missing composite indexes.
//!
//! The compound query is tried first. When the store reports
//! [`StoreError::IndexUnavailable`], the range-only query is issued instead
//! (the range field is always indexed), the extra condition is applied to
//! the fetched documents in memory, and the filtered set is truncated to the
//! plan's limit. Every other store error propagates unchanged.

use std::sync::Arc;

use sweep_core::{Document, DocumentRef, QueryPlan};

use crate::storage::StoreError;
use crate::traits::DocumentStore;

/// Documents matched by a plan, in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSet {
    pub collection: String,
    pub entries: Vec<(DocumentRef, Document)>,
    /// The extra condition was evaluated in memory rather than by the store.
    pub degraded: bool,
}

impl MatchSet {
    fn new(collection: &str, docs: Vec<Document>, degraded: bool) -> Self {
        let entries = docs
            .into_iter()
            .map(|doc| (doc.reference(collection), doc))
            .collect();
        Self {
            collection: collection.to_string(),
            entries,
            degraded,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// References of every match, in order.
    #[must_use]
    pub fn refs(&self) -> Vec<DocumentRef> {
        self.entries.iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.iter().map(|(_, doc)| doc)
    }
}

/// Runs [`QueryPlan`]s against a store, degrading to in-memory filtering
/// when the compound index is missing.
#[derive(Clone)]
pub struct FallbackExecutor {
    store: Arc<dyn DocumentStore>,
}

impl FallbackExecutor {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns any [`StoreError`] other than `IndexUnavailable` from the
    /// compound query, and any error at all from the range-only retry.
    pub async fn execute(&self, plan: &QueryPlan) -> Result<MatchSet, StoreError> {
        match self.store.query(&plan.compound_query()).await {
            Ok(mut docs) => {
                docs.truncate(plan.limit);
                Ok(MatchSet::new(&plan.collection, docs, false))
            }
            Err(StoreError::IndexUnavailable { fields, hint, .. }) => {
                tracing::info!(
                    collection = %plan.collection,
                    fields = %fields.join(","),
                    hint = hint.as_deref().unwrap_or(""),
                    "composite index unavailable; filtering range results in memory"
                );
                let docs = self.store.query(&plan.range_only_query()).await?;
                let scanned = docs.len();
                let filtered: Vec<Document> = docs
                    .into_iter()
                    .filter(|doc| plan.extra.as_ref().is_none_or(|c| c.matches(doc)))
                    .take(plan.limit)
                    .collect();
                tracing::debug!(
                    collection = %plan.collection,
                    scanned,
                    matched = filtered.len(),
                    "degraded query filtered"
                );
                Ok(MatchSet::new(&plan.collection, filtered, true))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sweep_core::{Condition, DateRange, QueryPlanner};

    use super::*;
    use crate::storage::{IndexCatalog, MemoryStore, StoreFault};

    fn lead(id: &str, day: u32, source: &str) -> Document {
        Document::new(id)
            .with("createdAt", Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap())
            .with("source", source)
    }

    fn seed(store: &MemoryStore) {
        store.insert_all(
            "leads",
            [
                lead("a", 2, "email"),
                lead("b", 3, "manual"),
                lead("c", 4, "email"),
                lead("d", 5, "manual"),
                lead("e", 6, "email"),
            ],
        );
        // Outside the range.
        let stale = Utc.with_ymd_and_hms(2024, 12, 31, 9, 0, 0).unwrap();
        store.insert("leads", lead("z", 1, "email").with("createdAt", stale));
    }

    fn plan(limit: usize) -> QueryPlan {
        let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
        let cond = Condition::parse("source==email").unwrap();
        QueryPlanner::default().plan("leads", range, Some(&cond), limit)
    }

    fn ids(set: &MatchSet) -> Vec<&str> {
        set.documents().map(|d| d.id.as_str()).collect()
    }

    #[tokio::test]
    async fn indexed_compound_query_is_not_degraded() {
        let store = Arc::new(MemoryStore::with_catalog(IndexCatalog::new().with("leads", "source")));
        seed(&store);

        let set = FallbackExecutor::new(store.clone()).execute(&plan(100)).await.unwrap();
        assert!(!set.degraded);
        assert_eq!(ids(&set), vec!["a", "c", "e"]);
        assert_eq!(store.query_log().len(), 1);
    }

    #[tokio::test]
    async fn missing_index_degrades_to_identical_matches() {
        let indexed = Arc::new(MemoryStore::with_catalog(IndexCatalog::new().with("leads", "source")));
        seed(&indexed);
        let unindexed = Arc::new(MemoryStore::new());
        seed(&unindexed);

        let expected = FallbackExecutor::new(indexed).execute(&plan(100)).await.unwrap();
        let degraded = FallbackExecutor::new(unindexed.clone()).execute(&plan(100)).await.unwrap();

        assert!(degraded.degraded);
        assert_eq!(degraded.entries, expected.entries);

        let log = unindexed.query_log();
        assert_eq!(log.len(), 2);
        assert!(log[1].filter.is_none());
        assert_eq!(log[1].limit, None);
    }

    #[tokio::test]
    async fn degraded_limit_applies_after_filtering() {
        let store = Arc::new(MemoryStore::new());
        seed(&store);

        let set = FallbackExecutor::new(store).execute(&plan(2)).await.unwrap();
        assert!(set.degraded);
        assert_eq!(ids(&set), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn other_store_errors_propagate() {
        let store = Arc::new(MemoryStore::new());
        seed(&store);
        store.fail_queries("leads", StoreFault::PermissionDenied);

        let err = FallbackExecutor::new(store.clone()).execute(&plan(10)).await.unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert_eq!(store.query_log().len(), 1);
    }

    #[tokio::test]
    async fn failing_fallback_query_propagates() {
        for fault in [StoreFault::PermissionDenied, StoreFault::Unavailable] {
            let store = Arc::new(MemoryStore::new());
            seed(&store);
            store.fail_range_only_queries("leads", fault);

            let err = FallbackExecutor::new(store.clone()).execute(&plan(10)).await.unwrap_err();
            assert!(
                matches!(err, StoreError::PermissionDenied { .. } | StoreError::Unavailable(_)),
                "{err}"
            );
            let queries = store.query_log();
            assert_eq!(queries.len(), 2);
            assert!(queries[0].is_compound());
            assert!(!queries[1].is_compound());
        }
    }

    #[tokio::test]
    async fn range_only_plan_never_degrades() {
        let store = Arc::new(MemoryStore::new());
        seed(&store);
        let range = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
        let plan = QueryPlanner::default().plan("leads", range, None, 10);

        let set = FallbackExecutor::new(store).execute(&plan).await.unwrap();
        assert!(!set.degraded);
        assert_eq!(set.len(), 5);
        assert_eq!(set.refs()[0], DocumentRef::new("leads", "a"));
    }
}
