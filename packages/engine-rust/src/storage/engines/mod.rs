//! `DocumentStore` implementations.
//!
//! - [`MemoryStore`]: `DashMap`-backed, with fault injection for tests.
//! - [`RedbStore`]: persistent, one `redb` table per collection.

mod memory;
#[cfg(feature = "redb")]
mod redb;

pub use memory::{MemoryStore, StoreFault};
#[cfg(feature = "redb")]
pub use self::redb::RedbStore;

use sweep_core::{Document, StoreQuery, Value};

/// Orders matches by the range field, then id, and applies the query limit.
///
/// Both stores scan and filter first, so this is where the query's ordering
/// and limit contract is enforced.
pub(crate) fn sort_and_limit(mut docs: Vec<Document>, query: &StoreQuery) -> Vec<Document> {
    docs.sort_by(|a, b| {
        let ta = a.get(&query.range_field).and_then(Value::as_timestamp);
        let tb = b.get(&query.range_field).and_then(Value::as_timestamp);
        ta.cmp(&tb).then_with(|| a.id.cmp(&b.id))
    });
    if let Some(limit) = query.limit {
        docs.truncate(limit);
    }
    docs
}
