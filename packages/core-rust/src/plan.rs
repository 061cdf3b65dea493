//! Query planning.
//!
//! A [`QueryPlan`] is pure data describing what a maintenance run wants from
//! one collection: a timestamp range (always indexed), at most one extra
//! [`Condition`], and a result limit. It says nothing about whether the
//! store can serve the extra condition through a composite index; that is
//! discovered at execution time. The plan can therefore be re-executed as a
//! [`StoreQuery`] in either of its two shapes without being rebuilt:
//!
//! - [`QueryPlan::compound_query`]: range and extra condition pushed to the
//!   store together, limit applied by the store.
//! - [`QueryPlan::range_only_query`]: range predicate only, unbounded, for
//!   filtering in memory.

use serde::Serialize;

use crate::condition::{Condition, Operator};
use crate::range::DateRange;
use crate::types::{Document, Value};

/// Field every collection is range-queried on unless configured otherwise.
pub const DEFAULT_RANGE_FIELD: &str = "createdAt";

/// What a run wants from a single collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    /// Target collection.
    pub collection: String,
    /// Timestamp field the range applies to.
    pub range_field: String,
    /// Inclusive timestamp range.
    pub range: DateRange,
    /// Optional extra predicate.
    pub extra: Option<Condition>,
    /// Maximum number of matches the run will act on.
    pub limit: usize,
}

impl QueryPlan {
    /// The range expressed as the two predicates sent to the store:
    /// `range_field >= from` and `range_field <= to`.
    #[must_use]
    pub fn range_conditions(&self) -> [Condition; 2] {
        [
            Condition::new(
                self.range_field.clone(),
                Operator::Gte,
                Value::Timestamp(self.range.start()),
            ),
            Condition::new(
                self.range_field.clone(),
                Operator::Lte,
                Value::Timestamp(self.range.end()),
            ),
        ]
    }

    /// Range plus extra condition in one store request.
    #[must_use]
    pub fn compound_query(&self) -> StoreQuery {
        StoreQuery {
            collection: self.collection.clone(),
            range_field: self.range_field.clone(),
            range: self.range,
            filter: self.extra.clone(),
            limit: Some(self.limit),
        }
    }

    /// Range predicate only, without a limit. The caller applies the extra
    /// condition and the limit after fetching.
    #[must_use]
    pub fn range_only_query(&self) -> StoreQuery {
        StoreQuery {
            collection: self.collection.clone(),
            range_field: self.range_field.clone(),
            range: self.range,
            filter: None,
            limit: None,
        }
    }

    /// Whether `doc` satisfies the whole plan (range and extra condition).
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.range_conditions().iter().all(|c| c.matches(doc))
            && self.extra.as_ref().is_none_or(|c| c.matches(doc))
    }
}

/// Builds [`QueryPlan`]s anchored on a fixed timestamp field.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    range_field: String,
}

impl QueryPlanner {
    #[must_use]
    pub fn new(range_field: impl Into<String>) -> Self {
        Self {
            range_field: range_field.into(),
        }
    }

    #[must_use]
    pub fn range_field(&self) -> &str {
        &self.range_field
    }

    /// Anchors a plan on the range and attaches the extra condition, if any.
    #[must_use]
    pub fn plan(
        &self,
        collection: &str,
        range: DateRange,
        extra: Option<&Condition>,
        limit: usize,
    ) -> QueryPlan {
        let plan = QueryPlan {
            collection: collection.to_string(),
            range_field: self.range_field.clone(),
            range,
            extra: extra.cloned(),
            limit,
        };
        tracing::debug!(
            collection = %plan.collection,
            range = %plan.range,
            extra = ?plan.extra.as_ref().map(ToString::to_string),
            limit = plan.limit,
            "query planned"
        );
        plan
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE_FIELD)
    }
}

/// A concrete request to the document store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreQuery {
    pub collection: String,
    pub range_field: String,
    pub range: DateRange,
    /// Extra predicate the store must evaluate alongside the range.
    pub filter: Option<Condition>,
    /// `None` means unbounded.
    pub limit: Option<usize>,
}

impl StoreQuery {
    /// Fields the store must index together to serve this query.
    #[must_use]
    pub fn indexed_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.range_field.as_str()];
        if let Some(filter) = &self.filter {
            if filter.field != self.range_field {
                fields.push(filter.field.as_str());
            }
        }
        fields
    }

    /// Whether the query combines the range with another field.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        self.indexed_fields().len() > 1
    }

    /// Reference evaluation of the query against one document. A document
    /// whose range field is missing or not a timestamp is out of range.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let in_range = doc
            .get(&self.range_field)
            .and_then(Value::as_timestamp)
            .is_some_and(|ts| self.range.contains(ts));
        in_range && self.filter.as_ref().is_none_or(|f| f.matches(doc))
    }
}
