//! Persistent [`DocumentStore`] backed by a `redb` database file.
//!
//! Each collection is a table keyed by document id; values are documents
//! encoded as named `MsgPack`. Queries scan the collection table and filter
//! with the shared predicate evaluation, after the [`IndexCatalog`] has
//! approved the query shape. A delete batch is one write transaction, so it
//! commits or fails as a whole.
//!
//! `redb` is synchronous; every call runs on the blocking pool.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use sweep_core::{Document, DocumentRef, StoreQuery};

use crate::storage::error::StoreError;
use crate::storage::index::IndexCatalog;
use crate::traits::DocumentStore;

use super::sort_and_limit;

fn table(collection: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(collection)
}

fn backend(err: impl Into<anyhow::Error>) -> StoreError {
    StoreError::Backend(err.into())
}

/// Document store persisted in a single `redb` file.
pub struct RedbStore {
    db: Arc<Database>,
    catalog: IndexCatalog,
    path: PathBuf,
}

impl RedbStore {
    /// Opens the database at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, catalog: IndexCatalog) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path)
            .with_context(|| format!("opening {}", path.display()))
            .map_err(StoreError::Backend)?;
        tracing::debug!(path = %path.display(), indexes = catalog.len(), "redb store opened");
        Ok(Self {
            db: Arc::new(db),
            catalog,
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes documents into `collection`, replacing any with the same id.
    ///
    /// Document creation belongs to the record services; this exists for
    /// seeding and tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on encoding or storage failure.
    pub async fn insert(&self, collection: &str, docs: Vec<Document>) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        let collection = collection.to_string();
        run_blocking(move || {
            let txn = db.begin_write().map_err(backend)?;
            {
                let mut t = txn.open_table(table(&collection)).map_err(backend)?;
                for doc in &docs {
                    let bytes = rmp_serde::to_vec_named(doc).map_err(backend)?;
                    t.insert(doc.id.as_str(), bytes.as_slice()).map_err(backend)?;
                }
            }
            txn.commit().map_err(backend)
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| StoreError::Backend(anyhow::anyhow!("blocking task failed: {err}")))?
}

#[async_trait]
impl DocumentStore for RedbStore {
    fn name(&self) -> &str {
        "redb"
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<Document>, StoreError> {
        self.catalog.check(query)?;

        let db = Arc::clone(&self.db);
        let query = query.clone();
        run_blocking(move || {
            let txn = db.begin_read().map_err(backend)?;
            let t = match txn.open_table(table(&query.collection)) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(err) => return Err(backend(err)),
            };

            let mut matched = Vec::new();
            for entry in t.iter().map_err(backend)? {
                let (_, value) = entry.map_err(backend)?;
                let doc: Document = rmp_serde::from_slice(value.value()).map_err(backend)?;
                if query.matches(&doc) {
                    matched.push(doc);
                }
            }
            Ok(sort_and_limit(matched, &query))
        })
        .await
    }

    async fn delete_batch(&self, refs: &[DocumentRef]) -> Result<(), StoreError> {
        if refs.len() > self.max_batch_size() {
            return Err(StoreError::BatchTooLarge {
                size: refs.len(),
                limit: self.max_batch_size(),
            });
        }

        let mut by_collection: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for doc_ref in refs {
            by_collection
                .entry(doc_ref.collection.clone())
                .or_default()
                .push(doc_ref.id.clone());
        }

        let db = Arc::clone(&self.db);
        run_blocking(move || {
            let txn = db.begin_write().map_err(backend)?;
            for (collection, ids) in &by_collection {
                let mut t = txn.open_table(table(collection)).map_err(backend)?;
                for id in ids {
                    t.remove(id.as_str()).map_err(backend)?;
                }
            }
            txn.commit().map_err(backend)
        })
        .await
    }
}
